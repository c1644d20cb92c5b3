//! Cancellation and deadline plumbing shared by every collection task.
//!
//! A `CollectContext` is handed to each `MetricSource::collect` call. It
//! carries the run's overall deadline and a `CancelToken` that can be tripped
//! from outside (Ctrl-C, an embedding application). Blocking work polls the
//! context in short steps so it can stop promptly.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::{Duration, Instant};

/// Step used when sleeping against a context.
pub const POLL_INTERVAL: Duration = Duration::from_millis(50);

/// Reason a task stopped before finishing its work.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Interrupt {
    /// The cancellation token was tripped.
    Cancelled,
    /// The run deadline passed.
    TimedOut,
}

impl fmt::Display for Interrupt {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Interrupt::Cancelled => write!(f, "cancelled"),
            Interrupt::TimedOut => write!(f, "deadline exceeded"),
        }
    }
}

/// Shared flag used to cancel in-flight collection.
///
/// Clones observe the same flag.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Trips the token. Idempotent.
    pub fn cancel(&self) {
        self.flag.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.flag.load(Ordering::SeqCst)
    }
}

/// Per-task view of a collection run.
#[derive(Debug, Clone, Default)]
pub struct CollectContext {
    cancel: CancelToken,
    deadline: Option<Instant>,
}

impl CollectContext {
    /// Context with no deadline that is never cancelled unless `token` is.
    pub fn new(cancel: CancelToken) -> Self {
        Self {
            cancel,
            deadline: None,
        }
    }

    /// Sets an absolute deadline.
    pub fn with_deadline(mut self, deadline: Instant) -> Self {
        self.deadline = Some(deadline);
        self
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Returns the interrupt that applies right now, if any.
    ///
    /// Cancellation wins over an expired deadline.
    pub fn check(&self) -> Result<(), Interrupt> {
        if self.cancel.is_cancelled() {
            return Err(Interrupt::Cancelled);
        }
        match self.deadline {
            Some(deadline) if Instant::now() >= deadline => Err(Interrupt::TimedOut),
            _ => Ok(()),
        }
    }

    /// Sleeps for `duration`, waking every `POLL_INTERVAL` to check for
    /// cancellation or deadline expiry.
    pub fn sleep(&self, duration: Duration) -> Result<(), Interrupt> {
        let mut remaining = duration;
        while remaining > Duration::ZERO {
            self.check()?;
            let step = remaining.min(POLL_INTERVAL);
            std::thread::sleep(step);
            remaining = remaining.saturating_sub(step);
        }
        self.check()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_token_clones_share_state() {
        let token = CancelToken::new();
        let other = token.clone();
        assert!(!other.is_cancelled());
        token.cancel();
        assert!(other.is_cancelled());
    }

    #[test]
    fn test_check_reports_cancel_before_timeout() {
        let token = CancelToken::new();
        token.cancel();
        let ctx = CollectContext::new(token).with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(Interrupt::Cancelled));
    }

    #[test]
    fn test_check_reports_expired_deadline() {
        let ctx = CollectContext::default().with_deadline(Instant::now());
        assert_eq!(ctx.check(), Err(Interrupt::TimedOut));
    }

    #[test]
    fn test_sleep_full_window() {
        let ctx = CollectContext::default();
        let start = Instant::now();
        assert_eq!(ctx.sleep(Duration::from_millis(120)), Ok(()));
        assert!(start.elapsed() >= Duration::from_millis(120));
    }

    #[test]
    fn test_sleep_returns_early_on_cancel() {
        let token = CancelToken::new();
        let ctx = CollectContext::new(token.clone());

        let canceller = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(100));
            token.cancel();
        });

        let start = Instant::now();
        assert_eq!(ctx.sleep(Duration::from_secs(5)), Err(Interrupt::Cancelled));
        assert!(start.elapsed() < Duration::from_secs(1));
        canceller.join().unwrap();
    }

    #[test]
    fn test_sleep_stops_at_deadline() {
        let ctx =
            CollectContext::default().with_deadline(Instant::now() + Duration::from_millis(100));
        let start = Instant::now();
        assert_eq!(ctx.sleep(Duration::from_secs(5)), Err(Interrupt::TimedOut));
        assert!(start.elapsed() < Duration::from_secs(1));
    }
}
