//! Exponential backoff with optional jitter.

use std::time::Duration;

use rand::Rng;

use crate::config::RetryConfig;

/// Delay before re-delivery number `retry_count + 1`.
///
/// `initial * multiplier^retry_count`, capped at `max_ms`, plus up to
/// `jitter_ratio` of the capped delay.
pub fn calculate_backoff(
    retry_count: u32,
    initial_ms: u64,
    multiplier: u32,
    max_ms: u64,
    jitter_ratio: f64,
) -> Duration {
    let factor = u64::from(multiplier).saturating_pow(retry_count);
    let capped_delay = initial_ms.saturating_mul(factor).min(max_ms);

    let jitter_range = (capped_delay as f64 * jitter_ratio) as u64;
    let jitter = if jitter_range > 0 {
        rand::thread_rng().gen_range(0..jitter_range)
    } else {
        0
    };

    Duration::from_millis(capped_delay + jitter)
}

/// Backoff for a retry count using the configured policy.
pub fn backoff_for(config: &RetryConfig, retry_count: u32) -> Duration {
    calculate_backoff(
        retry_count,
        config.initial_delay_ms,
        config.multiplier,
        config.max_delay_ms,
        config.jitter_ratio,
    )
}

/// Delays for every retry the policy allows, in order.
pub fn schedule(config: &RetryConfig) -> Vec<Duration> {
    (0..config.max_attempts)
        .map(|retry_count| backoff_for(config, retry_count))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_backoff_calculation() {
        assert_eq!(calculate_backoff(0, 1000, 2, 60_000, 0.0), Duration::from_secs(1));
        assert_eq!(calculate_backoff(1, 1000, 2, 60_000, 0.0), Duration::from_secs(2));
        assert_eq!(calculate_backoff(2, 1000, 2, 60_000, 0.0), Duration::from_secs(4));

        // Capped
        assert_eq!(calculate_backoff(10, 1000, 2, 5_000, 0.0), Duration::from_secs(5));
        // No overflow on huge exponents
        assert_eq!(calculate_backoff(200, 1000, 10, 5_000, 0.0), Duration::from_secs(5));
    }

    #[test]
    fn test_jitter_bounds() {
        for _ in 0..50 {
            let delay = calculate_backoff(1, 1000, 2, 60_000, 0.1);
            assert!(delay >= Duration::from_millis(2000));
            assert!(delay < Duration::from_millis(2200));
        }
    }

    #[test]
    fn test_schedule() {
        let config = RetryConfig::default();
        assert_eq!(
            schedule(&config),
            vec![
                Duration::from_secs(1),
                Duration::from_secs(2),
                Duration::from_secs(4)
            ]
        );

        let never = RetryConfig {
            max_attempts: 0,
            ..RetryConfig::default()
        };
        assert!(schedule(&never).is_empty());
    }
}
