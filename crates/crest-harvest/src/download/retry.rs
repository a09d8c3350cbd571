//! Retry classification and backoff timing for asset downloads.

use crate::config::DownloadConfig;
use rand::Rng;
use std::time::Duration;

/// What to do with an HTTP status.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Success,
    /// 429: back off with jitter and retry.
    RateLimited,
    /// Anything else: the asset is not coming; do not retry.
    Permanent,
}

pub fn classify(status: u16) -> StatusClass {
    match status {
        200 => StatusClass::Success,
        429 => StatusClass::RateLimited,
        _ => StatusClass::Permanent,
    }
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Attempts after the first.
    pub max_retries: u32,
    pub base_delay: Duration,
    pub rate_limit_jitter: Duration,
}

impl RetryPolicy {
    pub fn from_config(config: &DownloadConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.base_delay_ms),
            rate_limit_jitter: Duration::from_millis(config.rate_limit_jitter_ms),
        }
    }

    pub fn attempts(&self) -> u32 {
        self.max_retries + 1
    }

    /// `base * 2^attempt`, saturating.
    pub fn backoff(&self, attempt: u32) -> Duration {
        let factor = 1u32.checked_shl(attempt).unwrap_or(u32::MAX);
        self.base_delay.saturating_mul(factor)
    }

    /// Backoff for a 429, with up to `rate_limit_jitter` added.
    pub fn rate_limited_backoff(&self, attempt: u32) -> Duration {
        self.backoff(attempt)
            .saturating_add(random_up_to(self.rate_limit_jitter))
    }
}

/// Uniform random duration in `[0, max]`.
pub fn random_up_to(max: Duration) -> Duration {
    let max_ms = max.as_millis() as u64;
    if max_ms == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rand::thread_rng().gen_range(0..=max_ms))
}
