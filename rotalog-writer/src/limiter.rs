//! Rate-limited log emission.
//!
//! Under error storms (a dependency down, a disk full) the same report can
//! fire thousands of times per second. [`RateLimitedSink`] lets one call
//! through per cooldown window and counts the rest; the next call that passes
//! first reports how many were dropped.
//!
//! ```ignore
//! let sink = RateLimitedSink::new(100);
//! for _ in 0..1000 {
//!     sink.emit(|| tracing::error!("upstream unavailable"));
//! }
//! ```

use std::fmt;
use std::sync::atomic::{AtomicI64, AtomicU32, Ordering};

use rotalog_core::{SharedClock, SystemClock};

type NoticeFn = Box<dyn Fn(u32) + Send + Sync>;

/// Lets at most one call through per cooldown window.
///
/// Only atomics are touched, so two calls racing on the window boundary may
/// both pass.
pub struct RateLimitedSink {
    /// `<= 0` disables throttling.
    cooldown_millis: i64,
    last_emit_millis: AtomicI64,
    discarded: AtomicU32,
    clock: SharedClock,
    notice: NoticeFn,
}

impl RateLimitedSink {
    pub fn new(cooldown_millis: i64) -> Self {
        Self::with_clock(cooldown_millis, SystemClock::shared())
    }

    pub fn with_clock(cooldown_millis: i64, clock: SharedClock) -> Self {
        Self {
            cooldown_millis,
            last_emit_millis: AtomicI64::new(0),
            discarded: AtomicU32::new(0),
            clock,
            notice: Box::new(|discarded| {
                tracing::error!(discarded, "Discarded {discarded} error messages");
            }),
        }
    }

    /// Replace the handler that reports the discard count.
    pub fn with_notice(mut self, notice: impl Fn(u32) + Send + Sync + 'static) -> Self {
        self.notice = Box::new(notice);
        self
    }

    /// Run `render` unless a call already passed within the cooldown window.
    ///
    /// Returns true if `render` ran.
    pub fn emit<F: FnOnce()>(&self, render: F) -> bool {
        if self.cooldown_millis <= 0 {
            render();
            return true;
        }

        let now = self.clock.now_millis();
        let last = self.last_emit_millis.load(Ordering::Acquire);
        if now.saturating_sub(last) > self.cooldown_millis {
            self.last_emit_millis.store(now, Ordering::Release);
            let discarded = self.discarded.swap(0, Ordering::AcqRel);
            if discarded > 0 {
                (self.notice)(discarded);
            }
            render();
            true
        } else {
            self.discarded.fetch_add(1, Ordering::AcqRel);
            false
        }
    }

    /// Calls dropped since the last one that passed.
    pub fn discarded(&self) -> u32 {
        self.discarded.load(Ordering::Acquire)
    }

    pub fn cooldown_millis(&self) -> i64 {
        self.cooldown_millis
    }
}

impl fmt::Debug for RateLimitedSink {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RateLimitedSink")
            .field("cooldown_millis", &self.cooldown_millis)
            .field("last_emit_millis", &self.last_emit_millis)
            .field("discarded", &self.discarded)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::time::Duration;

    use parking_lot::Mutex;
    use rotalog_core::ManualClock;

    fn recording(
        cooldown: i64,
    ) -> (RateLimitedSink, Arc<ManualClock>, Arc<Mutex<Vec<u32>>>) {
        let clock = Arc::new(ManualClock::at_date(2024, 1, 1).expect("date"));
        let notices = Arc::new(Mutex::new(Vec::new()));
        let sink = RateLimitedSink::with_clock(cooldown, clock.clone()).with_notice({
            let notices = notices.clone();
            move |n| notices.lock().push(n)
        });
        (sink, clock, notices)
    }

    #[test]
    fn burst_inside_window_lets_one_through() {
        let (sink, clock, notices) = recording(100);
        let mut rendered = 0;

        for _ in 0..5 {
            sink.emit(|| rendered += 1);
            clock.advance(Duration::from_millis(10));
        }
        assert_eq!(rendered, 1);
        assert_eq!(sink.discarded(), 4);
        assert!(notices.lock().is_empty());

        clock.advance(Duration::from_millis(100));
        assert!(sink.emit(|| rendered += 1));
        assert_eq!(rendered, 2);
        assert_eq!(*notices.lock(), vec![4]);
        assert_eq!(sink.discarded(), 0);
    }

    #[test]
    fn no_notice_without_discards() {
        let (sink, clock, notices) = recording(100);
        assert!(sink.emit(|| {}));
        clock.advance(Duration::from_millis(101));
        assert!(sink.emit(|| {}));
        assert!(notices.lock().is_empty());
    }

    #[test]
    fn window_edge_is_exclusive() {
        let (sink, clock, _) = recording(100);
        assert!(sink.emit(|| {}));
        clock.advance(Duration::from_millis(100));
        assert!(!sink.emit(|| {}), "elapsed == cooldown must still throttle");
        clock.advance(Duration::from_millis(1));
        assert!(sink.emit(|| {}));
    }

    #[test]
    fn non_positive_cooldown_disables_throttling() {
        for cooldown in [0, -5] {
            let (sink, _, notices) = recording(cooldown);
            let mut rendered = 0;
            for _ in 0..10 {
                sink.emit(|| rendered += 1);
            }
            assert_eq!(rendered, 10);
            assert_eq!(sink.discarded(), 0);
            assert!(notices.lock().is_empty());
        }
    }

    #[test]
    fn concurrent_callers_account_for_every_call() {
        let (sink, _, notices) = recording(60_000);
        let sink = Arc::new(sink);
        let passed = Arc::new(std::sync::atomic::AtomicU32::new(0));

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let sink = sink.clone();
                let passed = passed.clone();
                std::thread::spawn(move || {
                    for _ in 0..100 {
                        if sink.emit(|| {}) {
                            passed.fetch_add(1, Ordering::Relaxed);
                        }
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().expect("join");
        }

        // A pass that races another pass may fold pending discards into a notice.
        let passed = passed.load(Ordering::Relaxed);
        let noticed: u32 = notices.lock().iter().sum();
        assert!(passed >= 1);
        assert_eq!(passed + sink.discarded() + noticed, 800);
    }
}
