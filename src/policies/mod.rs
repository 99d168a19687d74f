//! Revive policies.
//!
//! ## Contents
//! - [`RevivePolicy`] whether a replacement is forked immediately or after a delay
//! - [`BackoffPolicy`] how the delay grows across a crash streak (first / factor / max + jitter)
//! - [`JitterPolicy`]  randomisation so simultaneous crashes don't revive in lockstep
//!
//! ## Wiring
//! ```text
//! PoolConfig { revive: RevivePolicy, .. }
//!      └─► core::master::Master on unexpected exit:
//!           - Immediate          → fork now
//!           - Backoff(b)         → ReviveScheduled{delay = b.next(streak)} → fork when due
//!           - dead worker was online ≥ stable_after() → streak = 0
//! ```

mod backoff;
mod jitter;
mod revive;

pub use backoff::BackoffPolicy;
pub use jitter::JitterPolicy;
pub use revive::RevivePolicy;
