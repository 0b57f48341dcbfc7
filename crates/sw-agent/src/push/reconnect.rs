//! Exponential backoff for push-socket reconnection

use std::time::Duration;

use sw_core::config::BackoffConfig;

/// Exponential backoff with jitter for reconnection attempts
pub struct ExponentialBackoff {
    config: BackoffConfig,
    /// Completed attempts since the last reset
    attempt: u32,
}

impl ExponentialBackoff {
    /// Create a new backoff from configuration
    pub fn from_config(config: &BackoffConfig) -> Self {
        Self {
            config: config.clone(),
            attempt: 0,
        }
    }

    /// Get the delay for the next attempt and advance
    pub fn next_delay(&mut self) -> Duration {
        let base = self.config.initial.as_secs_f64()
            * self.config.multiplier.powi(self.attempt as i32);
        let capped = base.min(self.config.max.as_secs_f64());
        self.attempt = self.attempt.saturating_add(1);

        let jitter = capped * self.config.jitter * rand::random::<f64>();
        Duration::from_secs_f64(capped + jitter)
    }

    /// Reset after a successful registration
    pub fn reset(&mut self) {
        self.attempt = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(jitter: f64) -> BackoffConfig {
        BackoffConfig {
            initial: Duration::from_secs(1),
            max: Duration::from_secs(60),
            multiplier: 2.0,
            jitter,
        }
    }

    #[test]
    fn test_backoff_doubles_up_to_max() {
        let mut backoff = ExponentialBackoff::from_config(&config(0.0));
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
        assert_eq!(backoff.next_delay(), Duration::from_secs(2));
        assert_eq!(backoff.next_delay(), Duration::from_secs(4));
        for _ in 0..10 {
            backoff.next_delay();
        }
        assert_eq!(backoff.next_delay(), Duration::from_secs(60));
    }

    #[test]
    fn test_reset_returns_to_initial() {
        let mut backoff = ExponentialBackoff::from_config(&config(0.0));
        backoff.next_delay();
        backoff.next_delay();
        backoff.reset();
        assert_eq!(backoff.next_delay(), Duration::from_secs(1));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let mut backoff = ExponentialBackoff::from_config(&config(0.5));
        let delay = backoff.next_delay();
        assert!(delay >= Duration::from_secs(1));
        assert!(delay <= Duration::from_secs_f64(1.5));
    }
}
