//! # Master-side supervisor state.
//!
//! ```text
//!            shutdown_workers          timeout elapsed
//! Running ───────────────────► Graceful ───────────────► Forced
//!                                 │                        │
//!                                 │ last worker exits      │ last worker exits
//!                                 ▼                        ▼
//!                              Drained ◄───────────────────┘
//! ```
//!
//! ## Rules
//! - The phase only moves forward along the arrows above.
//! - Outside `Running` no replacement is ever forked.

use crate::signal::ShutdownSignal;

/// Where the pool is in its shutdown protocol.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ShutdownPhase {
    /// Normal operation; unexpected deaths are revived.
    #[default]
    Running,
    /// Shutdown directives sent; waiting for workers within the timeout.
    Graceful,
    /// Timeout elapsed; force directives sent.
    Forced,
    /// No worker remains. Terminal.
    Drained,
}

impl ShutdownPhase {
    /// Whether moving from `self` to `next` is a legal step.
    pub fn can_transition_to(self, next: ShutdownPhase) -> bool {
        use ShutdownPhase::*;
        matches!(
            (self, next),
            (Running, Graceful) | (Graceful, Forced) | (Graceful, Drained) | (Forced, Drained)
        )
    }

    pub fn is_running(self) -> bool {
        self == ShutdownPhase::Running
    }
}

/// The master's single mutable record.
#[derive(Debug, Clone, Default)]
pub struct SupervisorState {
    live: usize,
    phase: ShutdownPhase,
    signal: Option<ShutdownSignal>,
}

impl SupervisorState {
    /// Number of workers that reported online and have not exited.
    pub fn live(&self) -> usize {
        self.live
    }

    pub fn phase(&self) -> ShutdownPhase {
        self.phase
    }

    /// Signal that started the shutdown, if one did.
    pub fn signal(&self) -> Option<ShutdownSignal> {
        self.signal
    }

    pub(crate) fn worker_online(&mut self) {
        self.live += 1;
    }

    /// Accounts for an exit; only workers that were online are counted down.
    pub(crate) fn worker_gone(&mut self, was_online: bool) {
        if was_online {
            self.live = self.live.saturating_sub(1);
        }
    }

    /// Moves to `next` if legal; returns whether it moved.
    pub(crate) fn advance(&mut self, next: ShutdownPhase) -> bool {
        if !self.phase.can_transition_to(next) {
            return false;
        }
        self.phase = next;
        true
    }

    /// `Running → Graceful`, recording the signal. `false` if already shutting down.
    pub(crate) fn begin_shutdown(&mut self, signal: ShutdownSignal) -> bool {
        if !self.advance(ShutdownPhase::Graceful) {
            return false;
        }
        self.signal = Some(signal);
        true
    }
}
