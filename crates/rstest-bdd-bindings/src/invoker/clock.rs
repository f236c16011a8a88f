//! Monotonic time source used to measure invocation durations.

use std::sync::OnceLock;
use std::time::{Duration, Instant};

/// Monotonic time elapsed since some fixed starting point.
pub trait Clock: Send + Sync {
    /// Time elapsed since the clock started. Never decreases.
    fn elapsed(&self) -> Duration;
}

static PROCESS_START: OnceLock<Instant> = OnceLock::new();

/// The process-wide clock, started once at its first reading.
///
/// Every `ProcessClock` value reads the same underlying start instant, so
/// timestamps taken by different invokers are comparable.
///
/// # Examples
///
/// ```
/// use rstest_bdd_bindings::{Clock, ProcessClock};
///
/// let first = ProcessClock.elapsed();
/// let second = ProcessClock.elapsed();
/// assert!(second >= first);
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct ProcessClock;

impl Clock for ProcessClock {
    fn elapsed(&self) -> Duration {
        PROCESS_START.get_or_init(Instant::now).elapsed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn readings_share_one_start() {
        let first = ProcessClock.elapsed();
        std::thread::sleep(Duration::from_millis(2));
        let second = ProcessClock.elapsed();
        assert!(second >= first + Duration::from_millis(2));
    }
}
