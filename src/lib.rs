//! # poolvisor
//!
//! **Poolvisor** is a multi-process worker pool supervisor for tokio programs.
//!
//! One binary plays two roles. The **master** forks a fixed number of worker
//! processes (re-executions of itself), revives workers that die unexpectedly
//! and, when a termination signal arrives, drives a two-phase shutdown:
//! graceful first, forced once a timeout elapses. Each **worker** runs the
//! user's entry point and obeys the master's directives.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!                 OS signals (INT, TERM, HUP, USR2 / Ctrl-C, Ctrl-Break)
//!                                   │
//!                                   ▼
//! ┌───────────────────────────────────────────────────────────────────┐
//! │  Supervisor (master process, single event-loop task)              │
//! │  - Master context: Registry of WorkerHandles + SupervisorState    │
//! │  - RevivePolicy (immediate or backoff)                            │
//! │  - shutdown timer (Graceful → Forced)                             │
//! └──────┬──────────────────┬──────────────────┬───────────────┬──────┘
//!        │ Directive        │ Directive        │ Directive     │ publish(Event)
//!        ▼                  ▼                  ▼               ▼
//!     ┌──────────────┐   ┌──────────────┐   ┌──────────────┐  ┌─────────┐
//!     │ worker #1    │   │ worker #2    │   │ worker #N    │  │   Bus   │
//!     │ WorkerRuntime│   │ WorkerRuntime│   │ WorkerRuntime│  └────┬────┘
//!     │ run / hook   │   │ run / hook   │   │ run / hook   │       ▼
//!     └──────┬───────┘   └──────┬───────┘   └──────┬───────┘  SubscriberSet
//!            │ online, exit     │                  │           ├─► LogWriter
//!            └──────────────────┴──────────────────┘           └─► user subscribers
//!                               ▼
//!                        Master observers
//! ```
//!
//! ### Lifecycle
//! ```text
//! master: fork × workers
//!   ├─► WorkerOnline          live += 1
//!   ├─► WorkerExited          Running → revive (1-for-1)
//!   │                         otherwise → drained once no worker remains
//!   ├─► signal / PoolHandle   first one wins:
//!   │     ├─ Shutdown{signal} to every worker, arm timeout
//!   │     └─ timeout while Graceful → ForceShutdown to every worker
//!   └─► drained ─► exit 0
//!
//! worker: report online, start run(id, ctx)
//!   ├─► Shutdown{signal}  first only: cancel ctx, hook(id, signal) → exit 0 / 1
//!   ├─► ForceShutdown     exit 1
//!   └─► run finished      per RunCompletion
//! ```
//!
//! ## Features
//! | Area              | Description                                                  | Key types / traits                          |
//! |-------------------|--------------------------------------------------------------|---------------------------------------------|
//! | **Pool**          | Role dispatch, configuration, process launch.                | [`Pool`], [`PoolBuilder`], [`PoolConfig`]   |
//! | **Entries**       | User work and cleanup, async or blocking.                    | [`RunFn`], [`HookFn`], [`EntryError`]       |
//! | **Supervision**   | Master event loop, caller-driven shutdown.                   | [`Supervisor`], [`PoolHandle`]              |
//! | **Policies**      | Revive immediately or with backoff.                          | [`RevivePolicy`], [`BackoffPolicy`]         |
//! | **Subscriber API**| Observe every protocol step.                                 | [`Subscribe`], [`Event`], [`LogWriter`]     |
//! | **Transport**     | Pluggable forking primitive and control channel.             | [`Spawn`], [`WorkerLink`], [`Control`]      |
//! | **Errors**        | Typed errors with stable labels.                             | [`ConfigError`], [`RuntimeError`]           |
//!
//! ## Example
//! ```rust,no_run
//! use std::time::Duration;
//! use poolvisor::{EntryError, HookFn, Pool, RunFn, ShutdownSignal, WorkerId};
//! use tokio_util::sync::CancellationToken;
//!
//! fn main() {
//!     let run = RunFn::arc(|id: WorkerId, ctx: CancellationToken| async move {
//!         while !ctx.is_cancelled() {
//!             tracing::info!(worker = id.get(), "tick");
//!             tokio::time::sleep(Duration::from_secs(1)).await;
//!         }
//!         Ok::<_, EntryError>(())
//!     });
//!     let hook = HookFn::arc(|id: WorkerId, signal: ShutdownSignal| async move {
//!         tracing::info!(worker = id.get(), %signal, "flushing");
//!         Ok::<_, EntryError>(())
//!     });
//!
//!     let pool = Pool::builder(run)
//!         .workers(4)
//!         .timeout(Duration::from_secs(5))
//!         .shutdown_hook(hook)
//!         .with_env_overrides()
//!         .build()
//!         .expect("valid pool configuration");
//!
//!     // Never returns: exits 0 once drained (master) or with the worker's status.
//!     pool.launch();
//! }
//! ```

mod core;
mod entry;
mod error;
mod events;
mod policies;
mod process;
mod protocol;
mod signal;
mod subscribers;

pub mod logging;

// ---- Public re-exports ----

pub use crate::core::{
    Decision, Exit, FORK_RETRY_DELAY, Pool, PoolBuilder, PoolConfig, PoolHandle, PoolReport,
    Role, RunCompletion, ShutdownPhase, ShutdownSignals, Supervisor, SupervisorState,
    TIMEOUT_ENV, WORKERS_ENV, WorkerId, WorkerOutcome, WorkerRuntime, WorkerState,
};
pub use entry::{HookFn, HookRef, RunEntry, RunFn, RunRef, ShutdownHook};
pub use error::{ChannelError, ConfigError, EntryError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use policies::{BackoffPolicy, JitterPolicy, RevivePolicy};
pub use process::{CONTROL_FD_ENV, Control, Notifier, Spawn, WORKER_ID_ENV, WorkerExit, WorkerLink};
#[cfg(unix)]
pub use process::{ControlChannel, ExecSpawner};
pub use protocol::{Directive, Report};
pub use signal::{ShutdownSignal, UnknownSignal};
pub use subscribers::{LogWriter, Subscribe, SubscriberSet};
