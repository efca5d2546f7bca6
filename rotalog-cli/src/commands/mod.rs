pub mod paths;
pub mod pipe;
pub mod prune;
