//! Retry policy: backoff delays between attempts.

use std::time::Duration;

use rand::Rng;

/// Exponential backoff for failed jobs.
///
/// Delay before retry `n` is `base_delay * multiplier^(n - 1)`; with the
/// defaults that gives 2s, 4s, 8s, 16s, ... Jitter spreads each delay by
/// ±10% so concurrent retries against the same downstream decorrelate.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Delay before the first retry.
    pub base_delay: Duration,

    /// Growth factor per failed attempt.
    pub multiplier: f64,

    /// Apply ±10% random spread to each delay.
    pub jitter: bool,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            base_delay: Duration::from_secs(2),
            multiplier: 2.0,
            jitter: true,
        }
    }
}

impl RetryPolicy {
    /// Fixed delay with no growth and no jitter. Mostly useful in tests.
    pub fn fixed(delay: Duration) -> Self {
        Self {
            base_delay: delay,
            multiplier: 1.0,
            jitter: false,
        }
    }

    /// Delay to wait after `attempts` executions have failed.
    pub fn next_delay(&self, attempts: u32) -> Duration {
        let exponent = attempts.saturating_sub(1) as i32;
        let mut secs = self.base_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if self.jitter {
            secs *= rand::thread_rng().gen_range(0.9..1.1);
        }
        Duration::from_secs_f64(secs)
    }
}
