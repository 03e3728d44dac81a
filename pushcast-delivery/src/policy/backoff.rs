//! Exponential backoff with jitter

use std::time::Duration;

use rand::Rng;

/// Calculate how long to wait before the next attempt
///
/// # Formula
/// `delay = min(base * 2^(attempt - 1), max_delay) * (1 ± jitter)`
///
/// # Arguments
/// * `attempt` - The number of attempts made so far (1-indexed)
/// * `base_delay_ms` - Delay after the first failed attempt
/// * `max_delay_ms` - Upper bound before jitter is applied
/// * `jitter_factor` - Jitter factor (e.g., 0.1 for ±10%)
#[must_use]
pub fn calculate_retry_delay(
    attempt: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter_factor: f64,
) -> Duration {
    let exponent = attempt.saturating_sub(1);
    let delay = if exponent >= 63 {
        // 2^63 would overflow, use max_delay directly
        max_delay_ms
    } else {
        let multiplier = 1u64 << exponent;
        base_delay_ms.saturating_mul(multiplier).min(max_delay_ms)
    };

    if jitter_factor <= 0.0 {
        return Duration::from_millis(delay);
    }

    // Intentional precision loss and casting for randomization
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let jittered = {
        let jitter_range = (delay as f64) * jitter_factor;
        let jitter: f64 = rand::rng().random_range(-jitter_range..=jitter_range);
        ((delay as f64) + jitter).max(0.0) as u64
    };

    Duration::from_millis(jittered)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_exponential_backoff_calculation() {
        assert_eq!(calculate_retry_delay(1, 100, 10_000, 0.0), Duration::from_millis(100));
        assert_eq!(calculate_retry_delay(2, 100, 10_000, 0.0), Duration::from_millis(200));
        assert_eq!(calculate_retry_delay(3, 100, 10_000, 0.0), Duration::from_millis(400));
    }

    #[test]
    fn test_backoff_is_capped() {
        assert_eq!(calculate_retry_delay(10, 100, 1_000, 0.0), Duration::from_millis(1_000));
        assert_eq!(calculate_retry_delay(200, 100, 1_000, 0.0), Duration::from_millis(1_000));
    }

    #[test]
    fn test_jitter_stays_in_range() {
        for _ in 0..100 {
            let delay = calculate_retry_delay(1, 1_000, 10_000, 0.2).as_millis();
            assert!((800..=1_200).contains(&delay), "delay {delay} out of range");
        }
    }
}
