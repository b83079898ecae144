//! ============================================================================
//! Retry Policy - Backoff and RPC Error Classification
//! ============================================================================
//! Read-only calls may be retried freely; this module provides:
//! - Exponential backoff with jitter between read attempts
//! - Classification of provider errors (revert vs rejection vs transport)
//! - Revert-reason extraction from node error strings
//! ============================================================================

use std::time::Duration;

/// Configuration for read retries and settlement polling
#[derive(Debug, Clone)]
pub struct RetryConfig {
    /// Maximum attempts for a read-only call
    pub max_read_retries: u32,
    /// Base delay between retries (multiplied by 2^attempt)
    pub base_delay_ms: u64,
    /// Maximum delay between retries
    pub max_delay_ms: u64,
    /// Interval between receipt polls while awaiting settlement
    pub poll_interval_ms: u64,
    /// Whether to add jitter to delays
    pub jitter: bool,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_read_retries: 3,
            base_delay_ms: 500,
            max_delay_ms: 10_000,
            poll_interval_ms: 2_000,
            jitter: true,
        }
    }
}

/// Classification of a provider error string
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    /// The node executed the call/transaction and the contract rejected it
    Reverted,
    /// The signer capability declined the request
    UserRejected,
    /// Rate limited, back off more aggressively
    RateLimited,
    /// Transient transport failure, retry
    Retryable,
}

/// Classify a provider error to decide between surfacing and retrying
pub fn classify_error(error: &str) -> ErrorKind {
    let lower = error.to_lowercase();

    if lower.contains("execution reverted")
        || lower.contains("revert")
        || lower.contains("out of gas")
    {
        return ErrorKind::Reverted;
    }

    if lower.contains("user rejected")
        || lower.contains("user denied")
        || lower.contains("rejected the request")
    {
        return ErrorKind::UserRejected;
    }

    if lower.contains("rate limit")
        || lower.contains("too many requests")
        || lower.contains("429")
    {
        return ErrorKind::RateLimited;
    }

    // Transport noise and anything unknown: retryable
    ErrorKind::Retryable
}

/// Pull the human-readable revert reason out of a node error string, if the
/// node forwarded one ("execution reverted: <reason>").
pub fn extract_revert_reason(error: &str) -> Option<String> {
    let lower = error.to_lowercase();
    let idx = lower.find("execution reverted")?;
    let tail = &error[idx + "execution reverted".len()..];
    let reason = tail
        .trim_start_matches([':', ' '])
        .trim_end_matches(['"', ')', '.'])
        .trim();
    if reason.is_empty() {
        None
    } else {
        Some(reason.to_string())
    }
}

/// Calculate delay with exponential backoff and optional jitter
pub fn calculate_delay(attempt: u32, config: &RetryConfig) -> Duration {
    let multiplier = 2u64.saturating_pow(attempt.min(63));
    let base_delay = config.base_delay_ms.saturating_mul(multiplier);
    let capped_delay = base_delay.min(config.max_delay_ms);

    let final_delay = if config.jitter {
        // 0-50% jitter on top of the capped delay
        let jitter_factor = 1.0 + (rand_simple() * 0.5);
        (capped_delay as f64 * jitter_factor) as u64
    } else {
        capped_delay
    };

    Duration::from_millis(final_delay)
}

/// Simple pseudo-random number generator (0.0 to 1.0), time-seeded
fn rand_simple() -> f64 {
    use std::time::SystemTime;
    let nanos = SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap_or_default()
        .subsec_nanos();
    (nanos % 1000) as f64 / 1000.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_classify_reverts() {
        let reverts = [
            "server returned an error response: execution reverted: ExceedMaxReserve",
            "execution reverted",
            "transaction reverted without a reason",
        ];
        for error in reverts {
            assert_eq!(classify_error(error), ErrorKind::Reverted, "for: {error}");
        }
    }

    #[test]
    fn test_classify_user_rejection() {
        assert_eq!(
            classify_error("MetaMask Tx Signature: User denied transaction signature"),
            ErrorKind::UserRejected
        );
        assert_eq!(
            classify_error("user rejected the request"),
            ErrorKind::UserRejected
        );
    }

    #[test]
    fn test_classify_rate_limit() {
        for error in ["rate limit exceeded", "too many requests", "HTTP 429"] {
            assert_eq!(classify_error(error), ErrorKind::RateLimited, "for: {error}");
        }
    }

    #[test]
    fn test_classify_transport_noise_retryable() {
        for error in ["connection refused", "request timed out", "dns failure"] {
            assert_eq!(classify_error(error), ErrorKind::Retryable, "for: {error}");
        }
    }

    #[test]
    fn test_extract_revert_reason() {
        assert_eq!(
            extract_revert_reason("execution reverted: MCV2_Bond: SLIPPAGE_LIMIT").as_deref(),
            Some("MCV2_Bond: SLIPPAGE_LIMIT")
        );
        assert_eq!(extract_revert_reason("execution reverted"), None);
        assert_eq!(extract_revert_reason("connection refused"), None);
    }

    #[test]
    fn test_calculate_delay_deterministic_without_jitter() {
        let config = RetryConfig {
            jitter: false,
            ..Default::default()
        };

        assert_eq!(calculate_delay(0, &config), Duration::from_millis(500));
        assert_eq!(calculate_delay(1, &config), Duration::from_millis(1000));
        assert_eq!(calculate_delay(2, &config), Duration::from_millis(2000));
        // Capped at max_delay_ms
        assert_eq!(calculate_delay(10, &config), Duration::from_millis(10_000));
    }

    #[test]
    fn test_calculate_delay_with_jitter_stays_in_range() {
        let config = RetryConfig {
            jitter: true,
            base_delay_ms: 1000,
            max_delay_ms: 10_000,
            ..Default::default()
        };

        for _ in 0..10 {
            let delay = calculate_delay(0, &config);
            assert!(delay >= Duration::from_millis(1000));
            assert!(delay <= Duration::from_millis(1500));
        }
    }
}
