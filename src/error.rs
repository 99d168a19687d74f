//! Error types used by the poolvisor runtime and user entry points.
//!
//! - [`ConfigError`]: invalid pool configuration, surfaced synchronously at startup.
//! - [`RuntimeError`]: failures of the supervisor itself (startup fork, signal registration).
//! - [`EntryError`]: failures reported by a run entry or shutdown hook.
//! - [`ChannelError`]: control-channel transport failures.
//!
//! All types provide `as_label` for logs/metrics. Worker crashes and hook failures are
//! **not** runtime errors: they surface as worker exit codes only.

use thiserror::Error;

use crate::core::WorkerId;

/// # Invalid pool configuration.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    /// Pool size must be at least one worker.
    #[error("worker count must be at least 1")]
    ZeroWorkers,

    /// Event bus needs room for at least one event.
    #[error("bus capacity must be at least 1")]
    ZeroBusCapacity,

    /// Revive backoff factor is negative or not finite.
    #[error("revive backoff factor must be finite and >= 0, got {factor}")]
    InvalidBackoff {
        /// The rejected factor.
        factor: f64,
    },

    /// An environment override could not be parsed.
    #[error("invalid value {value:?} for {var}: {reason}")]
    InvalidEnv {
        /// Variable name.
        var: &'static str,
        /// Raw value found in the environment.
        value: String,
        /// What was expected.
        reason: &'static str,
    },
}

impl ConfigError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ConfigError::ZeroWorkers => "config_zero_workers",
            ConfigError::ZeroBusCapacity => "config_zero_bus_capacity",
            ConfigError::InvalidBackoff { .. } => "config_invalid_backoff",
            ConfigError::InvalidEnv { .. } => "config_invalid_env",
        }
    }
}

/// # Errors produced by the supervisor runtime.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum RuntimeError {
    /// Configuration rejected before anything was forked.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// A worker could not be forked during startup.
    #[error("failed to fork worker {worker}: {reason}")]
    Spawn {
        /// Identity the worker would have had.
        worker: WorkerId,
        /// Underlying failure.
        reason: String,
    },

    /// Registering OS signal listeners failed.
    #[error("failed to install signal handlers: {0}")]
    Signals(#[source] std::io::Error),

    /// The executable to re-execute for workers could not be located.
    #[error("cannot locate worker executable: {0}")]
    CurrentExe(#[source] std::io::Error),

    /// Worker role was selected but its environment is incomplete.
    #[error("worker environment invalid: {0}")]
    WorkerEnv(String),
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use poolvisor::{ConfigError, RuntimeError};
    ///
    /// let err = RuntimeError::from(ConfigError::ZeroWorkers);
    /// assert_eq!(err.as_label(), "runtime_config");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::Config(_) => "runtime_config",
            RuntimeError::Spawn { .. } => "runtime_spawn",
            RuntimeError::Signals(_) => "runtime_signals",
            RuntimeError::CurrentExe(_) => "runtime_current_exe",
            RuntimeError::WorkerEnv(_) => "runtime_worker_env",
        }
    }
}

/// # Errors produced by user entry points.
///
/// Returned by a [`RunEntry`](crate::RunEntry) or [`ShutdownHook`](crate::ShutdownHook).
/// Any variant makes the worker exit with status 1.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum EntryError {
    /// The callable reported a failure.
    #[error("execution failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// The callable panicked.
    #[error("panicked: {info}")]
    Panicked {
        /// Panic payload, if it was a string.
        info: String,
    },
}

impl EntryError {
    /// Convenience constructor for [`EntryError::Fail`].
    pub fn fail(error: impl Into<String>) -> Self {
        EntryError::Fail {
            error: error.into(),
        }
    }

    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            EntryError::Fail { .. } => "entry_failed",
            EntryError::Panicked { .. } => "entry_panicked",
        }
    }
}

/// Renders a panic payload: the message if it was a string, a placeholder otherwise.
pub(crate) fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(msg) = payload.downcast_ref::<&'static str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "unknown panic".to_string()
    }
}

impl From<String> for EntryError {
    fn from(error: String) -> Self {
        EntryError::Fail { error }
    }
}

impl From<&str> for EntryError {
    fn from(error: &str) -> Self {
        EntryError::fail(error)
    }
}

impl From<std::io::Error> for EntryError {
    fn from(err: std::io::Error) -> Self {
        EntryError::fail(err.to_string())
    }
}

/// # Control-channel failures.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ChannelError {
    /// The peer end is gone.
    #[error("control channel closed")]
    Closed,

    /// Reading or writing the underlying stream failed.
    #[error("control channel i/o: {0}")]
    Io(#[from] std::io::Error),

    /// A message could not be encoded or decoded.
    #[error("control message codec: {0}")]
    Codec(#[from] serde_json::Error),
}

impl ChannelError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ChannelError::Closed => "channel_closed",
            ChannelError::Io(_) => "channel_io",
            ChannelError::Codec(_) => "channel_codec",
        }
    }
}
