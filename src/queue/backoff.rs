//! Delay policies between broker connection attempts

use std::time::Duration;

use rand::Rng;

/// Decides how long to wait before the next connection attempt
pub trait BackoffStrategy: Send + Sync {
    /// Delay to sleep after the failed 1-based `attempt`
    fn next_delay(&self, attempt: u32) -> Duration;
}

/// Same delay after every attempt
#[derive(Debug, Clone, Copy)]
pub struct FixedBackoff {
    delay: Duration,
}

impl FixedBackoff {
    pub fn new(delay: Duration) -> Self {
        Self { delay }
    }
}

impl BackoffStrategy for FixedBackoff {
    fn next_delay(&self, _attempt: u32) -> Duration {
        self.delay
    }
}

/// Doubling delay with up to 25% jitter, capped at `max`
#[derive(Debug, Clone, Copy)]
pub struct ExponentialBackoff {
    base: Duration,
    max: Duration,
}

impl ExponentialBackoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }
}

impl BackoffStrategy for ExponentialBackoff {
    fn next_delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let base_ms = u64::try_from(self.base.as_millis()).unwrap_or(u64::MAX);
        let max_ms = u64::try_from(self.max.as_millis()).unwrap_or(u64::MAX);

        let delay_ms = base_ms.saturating_mul(2u64.saturating_pow(attempt - 1));
        let jitter = if delay_ms > 0 {
            rand::rng().random_range(0..=delay_ms / 4)
        } else {
            0
        };

        Duration::from_millis(delay_ms.saturating_add(jitter).min(max_ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fixed_backoff_is_constant() {
        let backoff = FixedBackoff::new(Duration::from_secs(5));
        assert_eq!(backoff.next_delay(1), Duration::from_secs(5));
        assert_eq!(backoff.next_delay(4), Duration::from_secs(5));
    }

    #[test]
    fn test_exponential_backoff_doubles() {
        let backoff = ExponentialBackoff::new(Duration::from_millis(1000), Duration::from_secs(60));

        let d1 = backoff.next_delay(1).as_millis();
        assert!((1000..=1250).contains(&d1));

        let d3 = backoff.next_delay(3).as_millis();
        assert!((4000..=5000).contains(&d3));
    }

    #[test]
    fn test_exponential_backoff_respects_max() {
        let backoff = ExponentialBackoff::new(Duration::from_secs(10), Duration::from_secs(60));
        assert!(backoff.next_delay(10) <= Duration::from_secs(60));
        assert!(backoff.next_delay(200) <= Duration::from_secs(60));
        assert_eq!(backoff.next_delay(0), Duration::ZERO);
    }
}
