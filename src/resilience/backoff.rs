//! Exponential backoff with jitter.

use rand::Rng;
use std::time::Duration;

/// Delay schedule between attempts of a failed operation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Backoff {
    base: Duration,
    max: Duration,
}

impl Backoff {
    pub fn new(base: Duration, max: Duration) -> Self {
        Self { base, max }
    }

    pub fn from_millis(base_ms: u64, max_ms: u64) -> Self {
        Self::new(Duration::from_millis(base_ms), Duration::from_millis(max_ms))
    }

    /// Delay to wait after the `attempt`-th failure (1-based).
    ///
    /// `base * 2^(attempt-1)`, capped at `max`, plus up to 10% jitter.
    pub fn delay(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }

        let factor = 2u32.saturating_pow(attempt - 1);
        let capped = self.base.saturating_mul(factor).min(self.max);

        let jitter_range = capped / 10;
        let jitter = if jitter_range.is_zero() {
            Duration::ZERO
        } else {
            rand::thread_rng().gen_range(Duration::ZERO..jitter_range)
        };

        capped + jitter
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_grows_then_caps() {
        let backoff = Backoff::from_millis(100, 1000);

        assert_eq!(backoff.delay(0), Duration::ZERO);

        let first = backoff.delay(1);
        assert!(first >= Duration::from_millis(100) && first < Duration::from_millis(110));

        let second = backoff.delay(2);
        assert!(second >= Duration::from_millis(200) && second < Duration::from_millis(220));

        let capped = backoff.delay(10);
        assert!(capped >= Duration::from_millis(1000) && capped < Duration::from_millis(1100));
    }

    #[test]
    fn test_huge_attempt_does_not_overflow() {
        let backoff = Backoff::from_millis(u64::MAX / 2, u64::MAX);
        let _ = backoff.delay(u32::MAX);
    }
}
