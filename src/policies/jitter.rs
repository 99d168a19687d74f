//! # Jitter for revive delays.
//!
//! When many workers crash at once (a bad deploy, a lost dependency), their
//! replacements would otherwise be scheduled on the same tick. [`JitterPolicy`]
//! spreads them out:
//!
//! - [`JitterPolicy::None`]: exact delay;
//! - [`JitterPolicy::Full`]: uniform in `[0, delay]`;
//! - [`JitterPolicy::Equal`]: `delay/2 + uniform[0, delay/2]`.

use std::time::Duration;

use rand::Rng;

/// Randomisation applied to a computed revive delay.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum JitterPolicy {
    /// Use the delay as computed.
    #[default]
    None,
    /// Uniformly random in `[0, delay]`.
    Full,
    /// Keeps at least half of the delay, randomises the rest.
    Equal,
}

impl JitterPolicy {
    /// Applies the jitter to `delay`.
    pub fn apply(&self, delay: Duration) -> Duration {
        let ms = delay.as_millis().min(u128::from(u64::MAX)) as u64;
        if ms == 0 {
            return delay;
        }
        match self {
            JitterPolicy::None => delay,
            JitterPolicy::Full => Duration::from_millis(rand::rng().random_range(0..=ms)),
            JitterPolicy::Equal => {
                let half = ms / 2;
                let extra = if half == 0 {
                    0
                } else {
                    rand::rng().random_range(0..=half)
                };
                Duration::from_millis(half + extra)
            }
        }
    }
}
