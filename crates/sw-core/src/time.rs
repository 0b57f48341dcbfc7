//! Time helpers
//!
//! Wall-clock stamps are Unix milliseconds throughout the protocol; presence
//! derivation and watchdog checks work on elapsed time computed from them.

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// Current Unix timestamp in milliseconds.
///
/// # Panics
/// Panics if the system clock is set before the Unix epoch.
pub fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("system time before UNIX epoch")
        .as_millis() as u64
}

/// Current Unix timestamp in seconds.
///
/// # Panics
/// Panics if the system clock is set before the Unix epoch.
pub fn now_secs() -> u64 {
    now_millis() / 1000
}

/// Elapsed time since a millisecond timestamp; zero for future stamps.
pub fn elapsed_since(stamp_millis: u64) -> Duration {
    Duration::from_millis(now_millis().saturating_sub(stamp_millis))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_now_is_positive() {
        assert!(now_millis() > 0);
        assert!(now_secs() > 0);
    }

    #[test]
    fn test_elapsed_since_past() {
        let earlier = now_millis() - 1500;
        let elapsed = elapsed_since(earlier);
        assert!(elapsed >= Duration::from_millis(1500));
    }

    #[test]
    fn test_elapsed_since_future_is_zero() {
        let future = now_millis() + 60_000;
        assert_eq!(elapsed_since(future), Duration::ZERO);
    }
}
