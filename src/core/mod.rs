//! Runtime core: both roles of the pool.
//!
//! The public entry point is [`Pool`]; [`Supervisor`] and [`WorkerRuntime`] are
//! exposed for embedders bringing their own forking primitive or transport.
//!
//! Internal modules:
//! - [`master`]: master state machine (fork, online/exit observers, revive, shutdown protocol);
//! - [`supervisor`]: single-task event loop owning the master context;
//! - [`worker`]: worker-side directive handling around the user's entries;
//! - [`registry`]: worker ids and master-side handles;
//! - [`state`]: shutdown phases and the master's counters;
//! - [`shutdown`]: cross-platform OS signal listener;
//! - [`pool`] / [`builder`]: role dispatch and configuration.

mod builder;
mod config;
mod master;
mod pool;
mod registry;
mod shutdown;
mod state;
mod supervisor;
mod worker;

pub use builder::PoolBuilder;
pub use config::{PoolConfig, RunCompletion, TIMEOUT_ENV, WORKERS_ENV};
pub use master::{FORK_RETRY_DELAY, PoolReport};
pub use pool::{Exit, Pool, Role};
pub use registry::WorkerId;
pub use shutdown::ShutdownSignals;
pub use state::{ShutdownPhase, SupervisorState};
pub use supervisor::{PoolHandle, Supervisor};
pub use worker::{Decision, WorkerOutcome, WorkerRuntime, WorkerState};

pub(crate) use master::PoolEvent;
