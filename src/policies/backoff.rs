//! # Exponential backoff between consecutive revives.
//!
//! The delay before the `n`-th consecutive replacement (0-based) is
//! `first × factor^n`, capped at `max`, then jittered. The base is derived from
//! `n` alone; a jittered value never feeds into the next computation.
//!
//! ```rust
//! use std::time::Duration;
//! use poolvisor::{BackoffPolicy, JitterPolicy};
//!
//! let backoff = BackoffPolicy {
//!     first: Duration::from_millis(50),
//!     max: Duration::from_secs(2),
//!     factor: 2.0,
//!     jitter: JitterPolicy::None,
//! };
//!
//! assert_eq!(backoff.next(0), Duration::from_millis(50));
//! assert_eq!(backoff.next(2), Duration::from_millis(200));
//! assert_eq!(backoff.next(9), Duration::from_secs(2));
//! ```

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::jitter::JitterPolicy;

/// Growth parameters for revive delays.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BackoffPolicy {
    /// Delay before the first replacement of a crash streak.
    pub first: Duration,
    /// Upper bound for any single delay.
    pub max: Duration,
    /// Multiplicative growth per consecutive crash; `1.0` keeps the delay constant.
    pub factor: f64,
    /// Randomisation applied after capping.
    pub jitter: JitterPolicy,
}

impl Default for BackoffPolicy {
    /// `first = 100ms`, `factor = 2.0`, `max = 30s`, no jitter.
    fn default() -> Self {
        Self {
            first: Duration::from_millis(100),
            max: Duration::from_secs(30),
            factor: 2.0,
            jitter: JitterPolicy::None,
        }
    }
}

impl BackoffPolicy {
    /// Delay for the given 0-based position in a crash streak.
    pub fn next(&self, streak: u32) -> Duration {
        let exp = streak.min(i32::MAX as u32) as i32;
        let secs = self.first.as_secs_f64() * self.factor.powi(exp);

        let base = if !secs.is_finite() || secs < 0.0 || secs > self.max.as_secs_f64() {
            self.max
        } else {
            Duration::from_secs_f64(secs)
        };
        self.jitter.apply(base)
    }

    /// Rejects factors that would make [`next`](Self::next) meaningless.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.factor.is_finite() || self.factor < 0.0 {
            return Err(ConfigError::InvalidBackoff {
                factor: self.factor,
            });
        }
        Ok(())
    }
}
