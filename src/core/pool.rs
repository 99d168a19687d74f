//! # Pool entry point and role dispatch.
//!
//! The same binary plays both roles. [`Pool::run`] looks at the environment:
//!
//! ```text
//! POOLVISOR_WORKER_ID unset ──► master: register signals, fork `workers`
//!                                re-executions of this binary, supervise
//!                                until drained  ──► Exit::Master (code 0)
//! POOLVISOR_WORKER_ID = <id> ──► worker: adopt fd 3, report online, run the
//!                                entry, obey directives ──► Exit::Worker (0 / 1)
//! ```
//!
//! Everything before `Pool::run` (building the pool, parsing arguments) runs in
//! both roles, so it must be deterministic and free of side effects.

use std::future::Future;
use std::sync::Arc;

use tracing::{error, info};

use crate::core::builder::PoolBuilder;
use crate::core::config::PoolConfig;
use crate::core::master::PoolReport;
use crate::core::registry::WorkerId;
use crate::core::shutdown::ShutdownSignals;
use crate::core::supervisor::Supervisor;
use crate::core::worker::{WorkerOutcome, WorkerRuntime};
use crate::entry::RunRef;
use crate::error::{ConfigError, RuntimeError};
use crate::process::{Spawn, WORKER_ID_ENV};
use crate::subscribers::Subscribe;

/// Which side of the pool this process is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Master,
    Worker(WorkerId),
}

impl Role {
    /// Reads the role from [`WORKER_ID_ENV`].
    pub fn from_env() -> Result<Self, RuntimeError> {
        Self::from_value(std::env::var(WORKER_ID_ENV).ok().as_deref())
    }

    fn from_value(raw: Option<&str>) -> Result<Self, RuntimeError> {
        let Some(raw) = raw else {
            return Ok(Role::Master);
        };
        raw.trim()
            .parse::<u64>()
            .map(|id| Role::Worker(WorkerId::new(id)))
            .map_err(|_| RuntimeError::WorkerEnv(format!("{WORKER_ID_ENV}={raw:?} is not a worker id")))
    }
}

/// How a pool process finished.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Exit {
    Master(PoolReport),
    Worker(WorkerOutcome),
}

impl Exit {
    /// Process exit code: 0 for a drained master, the outcome's code for a worker.
    pub fn code(&self) -> i32 {
        match self {
            Exit::Master(_) => 0,
            Exit::Worker(outcome) => outcome.code(),
        }
    }
}

/// A validated worker pool, ready to run in either role.
pub struct Pool {
    cfg: PoolConfig,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl Pool {
    pub fn builder(run: RunRef) -> PoolBuilder {
        PoolBuilder::new(run)
    }

    /// Pool from a full configuration, with the default subscribers.
    pub fn new(cfg: PoolConfig) -> Result<Self, ConfigError> {
        PoolBuilder::from_config(cfg).build()
    }

    pub(crate) fn from_parts(cfg: PoolConfig, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        Self { cfg, subscribers }
    }

    pub fn config(&self) -> &PoolConfig {
        &self.cfg
    }

    /// Supervisor over a custom forking primitive, without OS signal handling.
    pub fn supervisor<S: Spawn>(&self, spawner: S) -> Result<Supervisor<S>, ConfigError> {
        Supervisor::new(&self.cfg, spawner, self.subscribers.clone())
    }

    /// Worker runtime for `id`, to be served over any [`Control`](crate::Control).
    pub fn worker(&self, id: WorkerId) -> WorkerRuntime {
        WorkerRuntime::new(id, &self.cfg)
    }

    /// Supervises `spawner`'s workers, turning OS signals into a pool shutdown.
    pub async fn run_master<S: Spawn>(&self, spawner: S) -> Result<PoolReport, RuntimeError> {
        let mut signals = ShutdownSignals::register().map_err(RuntimeError::Signals)?;
        let sup = self.supervisor(spawner)?;
        let handle = sup.handle();

        let forward = tokio::spawn(async move {
            while let Some(signal) = signals.recv().await {
                info!(signal = signal.name(), "signal received");
                if !handle.shutdown(signal) {
                    break;
                }
            }
        });
        let res = sup.run().await;
        forward.abort();
        res
    }

    /// Runs this process's role to completion.
    #[cfg(unix)]
    pub async fn run(&self) -> Result<Exit, RuntimeError> {
        use crate::process::{ControlChannel, ExecSpawner};

        match Role::from_env()? {
            Role::Master => {
                let spawner = ExecSpawner::current_exe().map_err(RuntimeError::CurrentExe)?;
                self.run_master(spawner).await.map(Exit::Master)
            }
            Role::Worker(id) => {
                let channel = ControlChannel::from_env()?;
                let mut signals = ShutdownSignals::register().map_err(RuntimeError::Signals)?;
                let watcher = tokio::spawn(async move {
                    while let Some(signal) = signals.recv().await {
                        info!(worker = id.get(), signal = signal.name(), "signal received, awaiting directive");
                    }
                });

                let outcome = self.worker(id).serve(channel).await;
                watcher.abort();
                Ok(Exit::Worker(outcome))
            }
        }
    }

    /// Initialises logging, runs the role on a fresh multi-threaded runtime and
    /// exits the process with the role's exit code.
    #[cfg(unix)]
    pub fn launch(self) -> ! {
        crate::logging::init();
        std::process::exit(block_on_exit(self.run()))
    }
}

/// Drives `role` on a new multi-threaded runtime and returns its exit code.
///
/// The runtime is shut down in the background: a blocking entry still running
/// (a stuck hook after `ForceShutdown`, a run ignoring its token) never holds
/// the process past its outcome.
#[cfg(any(unix, test))]
fn block_on_exit<F>(role: F) -> i32
where
    F: Future<Output = Result<Exit, RuntimeError>>,
{
    let rt = match tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .build()
    {
        Ok(rt) => rt,
        Err(err) => {
            error!(error = %err, "failed to build tokio runtime");
            return 1;
        }
    };
    let code = match rt.block_on(role) {
        Ok(exit) => exit.code(),
        Err(err) => {
            error!(error = %err, label = err.as_label(), "pool failed");
            1
        }
    };
    rt.shutdown_background();
    code
}
