//! Exponential backoff with jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Doubling delay schedule, capped, with up to 10% jitter.
#[derive(Debug, Clone, Copy)]
pub struct BackoffPolicy {
    pub max_attempts: u32,
    pub base_ms: u64,
    pub max_ms: u64,
}

impl BackoffPolicy {
    pub fn from_config(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_ms: config.base_delay_ms,
            max_ms: config.max_delay_ms,
        }
    }

    /// Delay to wait after failed attempt number `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32) -> Duration {
        calculate_backoff(attempt, self.base_ms, self.max_ms)
    }
}

impl Default for BackoffPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}

/// Calculate exponential backoff delay with jitter.
pub fn calculate_backoff(attempt: u32, base_ms: u64, max_ms: u64) -> Duration {
    if attempt == 0 {
        return Duration::from_millis(0);
    }

    let exponential_base = 2u64.saturating_pow(attempt - 1);
    let delay_ms = base_ms.saturating_mul(exponential_base);
    let capped_delay = delay_ms.min(max_ms);

    // Apply jitter (0 to 10% of the delay)
    let jitter_range = capped_delay / 10;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_doubles_until_cap() {
        let b1 = calculate_backoff(1, 1000, 8000);
        assert!(b1.as_millis() >= 1000 && b1.as_millis() < 1100);

        let b2 = calculate_backoff(2, 1000, 8000);
        assert!(b2.as_millis() >= 2000 && b2.as_millis() < 2200);

        let capped = calculate_backoff(10, 1000, 8000);
        assert!(capped.as_millis() >= 8000 && capped.as_millis() < 8800);
    }

    #[test]
    fn test_zero_attempt_no_delay() {
        assert_eq!(calculate_backoff(0, 1000, 8000), Duration::ZERO);
    }

    #[test]
    fn test_policy_never_zero_attempts() {
        let policy = BackoffPolicy::from_config(&RetryConfig {
            max_attempts: 0,
            ..Default::default()
        });
        assert_eq!(policy.max_attempts, 1);
    }
}
