//! # When to fork a replacement for a worker that died while running.
//!
//! [`RevivePolicy::Immediate`] replaces 1-for-1 with no delay and no crash-loop
//! cap: a worker that dies on every start keeps the master forking in a tight
//! loop. [`RevivePolicy::Backoff`] delays the replacement by a growing amount
//! for every consecutive unexpected death. The streak resets when the worker
//! that died had been online for at least [`stable_after`](RevivePolicy::stable_after),
//! so a worker that crashes right after reporting online still backs off.
//!
//! In both cases the replacement is only forked if the pool is still running
//! at the moment the fork would happen.

use std::time::Duration;

use crate::error::ConfigError;
use crate::policies::backoff::BackoffPolicy;

/// Revive strategy for unexpected worker deaths.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub enum RevivePolicy {
    /// Fork the replacement right away.
    #[default]
    Immediate,
    /// Fork the replacement after `backoff.next(streak)`.
    Backoff(BackoffPolicy),
}

impl RevivePolicy {
    /// Delay before replacing the `streak`-th consecutive death (0-based).
    pub fn delay(&self, streak: u32) -> Duration {
        match self {
            RevivePolicy::Immediate => Duration::ZERO,
            RevivePolicy::Backoff(backoff) => backoff.next(streak),
        }
    }

    /// Online time after which a death no longer extends the crash streak.
    pub fn stable_after(&self) -> Duration {
        match self {
            RevivePolicy::Immediate => Duration::ZERO,
            RevivePolicy::Backoff(backoff) => backoff.max,
        }
    }

    pub(crate) fn validate(&self) -> Result<(), ConfigError> {
        match self {
            RevivePolicy::Immediate => Ok(()),
            RevivePolicy::Backoff(backoff) => backoff.validate(),
        }
    }
}
