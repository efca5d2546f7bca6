//! Timestamp and caller decoration for log lines.

use std::panic::Location;

use crate::clock::Clock;

/// `2024-05-01 13:45:10.123`
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// `"<time> <msg>"`
pub fn with_time(clock: &dyn Clock, msg: &str) -> String {
    format!("{} {msg}", clock.now().format(TIME_FORMAT))
}

/// `"<time> <file>:<line> <msg>"` where `<file>` is the last path component
/// of the caller's source file.
pub fn with_time_and_caller(clock: &dyn Clock, location: &Location<'_>, msg: &str) -> String {
    format!(
        "{} {} {msg}",
        clock.now().format(TIME_FORMAT),
        short_caller(location)
    )
}

/// `file.rs:42`
pub fn short_caller(location: &Location<'_>) -> String {
    let file = location.file();
    let short = file.rsplit(|c: char| c == '/' || c == '\\').next().unwrap_or(file);
    format!("{short}:{}", location.line())
}

/// Appends `\n` unless the message already ends with one.
pub fn ensure_newline(mut msg: String) -> String {
    if !msg.ends_with('\n') {
        msg.push('\n');
    }
    msg
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::clock::ManualClock;

    #[test]
    fn time_prefix_has_millisecond_precision() {
        let clock = ManualClock::at_date(2024, 5, 1).expect("date");
        assert_eq!(with_time(&clock, "hello"), "2024-05-01 12:00:00.000 hello");
    }

    #[test]
    fn caller_is_reduced_to_file_name() {
        let clock = ManualClock::at_date(2024, 5, 1).expect("date");
        let location = Location::caller();
        let line = with_time_and_caller(&clock, location, "boom");
        assert!(
            line.starts_with("2024-05-01 12:00:00.000 format.rs:"),
            "got: {line}"
        );
        assert!(line.ends_with(" boom"));
    }

    #[test]
    fn newline_is_added_once() {
        assert_eq!(ensure_newline("a".into()), "a\n");
        assert_eq!(ensure_newline("a\n".into()), "a\n");
    }
}
