//! # Pool configuration.
//!
//! [`PoolConfig`] is built once at startup and never changes. Both roles build
//! the same value: the master reads the sizing and shutdown fields, a worker
//! reads the entries and [`RunCompletion`].
//!
//! ## Environment overrides
//! [`PoolConfig::with_env_overrides`] (or `PoolBuilder::with_env_overrides`)
//! applies:
//!
//! | Variable               | Field     | Format                  |
//! |------------------------|-----------|-------------------------|
//! | `POOLVISOR_WORKERS`    | `workers` | positive integer        |
//! | `POOLVISOR_TIMEOUT_MS` | `timeout` | non-negative integer ms |

use std::fmt;
use std::time::Duration;

use crate::entry::{HookRef, RunRef};
use crate::error::ConfigError;
use crate::policies::RevivePolicy;

/// Overrides `workers`.
pub const WORKERS_ENV: &str = "POOLVISOR_WORKERS";

/// Overrides `timeout`, in milliseconds.
pub const TIMEOUT_ENV: &str = "POOLVISOR_TIMEOUT_MS";

/// What a worker does when its run entry returns before any shutdown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RunCompletion {
    /// `Ok` exits 0, `Err` exits 1.
    #[default]
    Exit,
    /// `Ok` keeps the worker alive until a directive arrives, `Err` exits 1.
    AwaitDirective,
}

/// Immutable pool configuration.
///
/// ## Field semantics
/// - `workers`: pool size (default: logical CPU count, at least 1)
/// - `timeout`: graceful window before force (default: 10s; `0` forces on the next tick)
/// - `revive`: replacement strategy for unexpected deaths (default: immediate)
/// - `on_run_complete`: outcome of a run entry finishing on its own (default: exit)
/// - `bus_capacity`: event bus ring buffer (default: 1024)
#[derive(Clone)]
pub struct PoolConfig {
    /// Worker entry point.
    pub run: RunRef,
    /// Optional worker shutdown hook.
    pub shutdown: Option<HookRef>,
    pub workers: usize,
    pub timeout: Duration,
    pub revive: RevivePolicy,
    pub on_run_complete: RunCompletion,
    pub bus_capacity: usize,
}

impl PoolConfig {
    /// Default shutdown timeout.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

    /// Configuration running `run` with every other field defaulted.
    pub fn new(run: RunRef) -> Self {
        Self {
            run,
            shutdown: None,
            workers: default_workers(),
            timeout: Self::DEFAULT_TIMEOUT,
            revive: RevivePolicy::default(),
            on_run_complete: RunCompletion::default(),
            bus_capacity: 1024,
        }
    }

    /// Checks the invariants the supervisor relies on.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers == 0 {
            return Err(ConfigError::ZeroWorkers);
        }
        if self.bus_capacity == 0 {
            return Err(ConfigError::ZeroBusCapacity);
        }
        self.revive.validate()
    }

    /// Applies `POOLVISOR_WORKERS` / `POOLVISOR_TIMEOUT_MS` from the process environment.
    pub fn with_env_overrides(self) -> Result<Self, ConfigError> {
        self.with_overrides_from(|var| std::env::var(var).ok())
    }

    /// Applies overrides from an arbitrary lookup (same variables as the environment).
    pub fn with_overrides_from(
        mut self,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<Self, ConfigError> {
        if let Some(raw) = lookup(WORKERS_ENV) {
            self.workers = match raw.trim().parse::<usize>() {
                Ok(n) if n > 0 => n,
                _ => {
                    return Err(ConfigError::InvalidEnv {
                        var: WORKERS_ENV,
                        value: raw,
                        reason: "expected a positive integer",
                    });
                }
            };
        }
        if let Some(raw) = lookup(TIMEOUT_ENV) {
            let ms = raw.trim().parse::<u64>().map_err(|_| ConfigError::InvalidEnv {
                var: TIMEOUT_ENV,
                value: raw.clone(),
                reason: "expected milliseconds as a non-negative integer",
            })?;
            self.timeout = Duration::from_millis(ms);
        }
        Ok(self)
    }
}

impl From<RunRef> for PoolConfig {
    fn from(run: RunRef) -> Self {
        PoolConfig::new(run)
    }
}

impl fmt::Debug for PoolConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PoolConfig")
            .field("workers", &self.workers)
            .field("timeout", &self.timeout)
            .field("has_shutdown_hook", &self.shutdown.is_some())
            .field("revive", &self.revive)
            .field("on_run_complete", &self.on_run_complete)
            .field("bus_capacity", &self.bus_capacity)
            .finish_non_exhaustive()
    }
}

/// Logical CPU count, or 1 when it cannot be determined.
fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
}
