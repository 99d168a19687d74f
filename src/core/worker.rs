//! # Worker runtime.
//!
//! Runs inside every forked worker process. It reports online, starts the
//! run entry and then reacts to directives from the master:
//!
//! ```text
//! directive                 WorkerState          effect
//! ─────────                 ───────────          ──────
//! Shutdown{signal}    ──►   first time      ──►  cancel run ctx; hook? run it : exit 0
//!                           already set     ──►  ignored
//! ForceShutdown       ──►   any             ──►  exit 1
//! Unknown             ──►   any             ──►  ignored
//!
//! hook Ok / Err             ──►  exit 0 / exit 1
//! run  Ok / Err             ──►  per RunCompletion, only while not shutting down
//! control channel closed    ──►  exit 1 unless already shutting down
//! ```
//!
//! The decision itself lives in [`WorkerState::on_directive`], which has no
//! I/O so it can be checked exhaustively; [`WorkerRuntime::serve`] wires it to
//! the control channel and the entry tasks.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{Instrument, debug, error, info, info_span, warn};

use crate::core::config::{PoolConfig, RunCompletion};
use crate::core::registry::WorkerId;
use crate::entry::{HookRef, RunRef, join_failure};
use crate::error::{ChannelError, EntryError};
use crate::process::Control;
use crate::protocol::{Directive, Report};
use crate::signal::ShutdownSignal;

/// How a worker process ends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WorkerOutcome {
    /// Exit status 0.
    Clean,
    /// Exit status 1.
    Failure,
}

impl WorkerOutcome {
    /// Process exit code.
    pub fn code(self) -> i32 {
        match self {
            WorkerOutcome::Clean => 0,
            WorkerOutcome::Failure => 1,
        }
    }
}

/// What the worker does with one directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Ignore,
    RunHook(ShutdownSignal),
    Exit(WorkerOutcome),
}

/// Worker-side protocol state.
#[derive(Debug, Clone, Default)]
pub struct WorkerState {
    shutting_down: bool,
}

impl WorkerState {
    pub fn is_shutting_down(&self) -> bool {
        self.shutting_down
    }

    /// Decides the reaction to `directive`.
    ///
    /// The first `Shutdown` flips the state for good, so the hook is started at
    /// most once. `ForceShutdown` ends the worker whatever the state.
    pub fn on_directive(&mut self, directive: &Directive, has_hook: bool) -> Decision {
        match directive {
            Directive::ForceShutdown => Decision::Exit(WorkerOutcome::Failure),
            Directive::Unknown => Decision::Ignore,
            Directive::Shutdown { .. } if self.shutting_down => Decision::Ignore,
            Directive::Shutdown { signal } => {
                self.shutting_down = true;
                if has_hook {
                    Decision::RunHook(*signal)
                } else {
                    Decision::Exit(WorkerOutcome::Clean)
                }
            }
        }
    }
}

type EntryTask = Option<JoinHandle<Result<(), EntryError>>>;

/// Everything one worker process needs to serve the protocol.
pub struct WorkerRuntime {
    id: WorkerId,
    run: RunRef,
    hook: Option<HookRef>,
    on_run_complete: RunCompletion,
}

impl WorkerRuntime {
    pub fn new(id: WorkerId, cfg: &PoolConfig) -> Self {
        Self {
            id,
            run: Arc::clone(&cfg.run),
            hook: cfg.shutdown.clone(),
            on_run_complete: cfg.on_run_complete,
        }
    }

    pub fn id(&self) -> WorkerId {
        self.id
    }

    /// Serves directives from `control` until the worker must exit.
    pub async fn serve<C: Control>(self, control: C) -> WorkerOutcome {
        let span = info_span!("worker", id = self.id.get());
        self.serve_inner(control).instrument(span).await
    }

    async fn serve_inner<C: Control>(self, mut control: C) -> WorkerOutcome {
        if let Err(err) = control.report(Report::Online).await {
            error!(error = %err, "failed to report online");
            return WorkerOutcome::Failure;
        }

        let token = CancellationToken::new();
        let mut state = WorkerState::default();
        let mut open = true;
        let mut hook_task: EntryTask = None;
        let mut run_task: EntryTask = {
            let run = Arc::clone(&self.run);
            let ctx = token.child_token();
            let id = self.id;
            Some(tokio::spawn(async move { run.run(id, ctx).await }))
        };

        let outcome = loop {
            tokio::select! {
                biased;

                received = control.recv(), if open => match received {
                    Ok(Some(directive)) => {
                        debug!(directive = directive.label(), "directive received");
                        match state.on_directive(&directive, self.hook.is_some()) {
                            Decision::Ignore => {}
                            Decision::Exit(outcome) => break outcome,
                            Decision::RunHook(signal) => {
                                token.cancel();
                                hook_task = self.start_hook(signal);
                            }
                        }
                    }
                    Ok(None) => {
                        open = false;
                        if !state.is_shutting_down() {
                            error!("control channel closed, master is gone");
                            break WorkerOutcome::Failure;
                        }
                    }
                    Err(ChannelError::Codec(err)) => {
                        warn!(error = %err, "ignoring malformed directive");
                    }
                    Err(err) => {
                        open = false;
                        if !state.is_shutting_down() {
                            error!(error = %err, "control channel failed");
                            break WorkerOutcome::Failure;
                        }
                    }
                },

                res = join_entry(&mut hook_task) => match res {
                    Ok(()) => {
                        info!("shutdown hook finished");
                        break WorkerOutcome::Clean;
                    }
                    Err(err) => {
                        error!(error = %err, label = err.as_label(), "shutdown hook failed");
                        break WorkerOutcome::Failure;
                    }
                },

                res = join_entry(&mut run_task) => {
                    if state.is_shutting_down() {
                        debug!(ok = res.is_ok(), "run entry finished during shutdown");
                        continue;
                    }
                    match (res, self.on_run_complete) {
                        (Ok(()), RunCompletion::Exit) => {
                            info!("run entry finished");
                            break WorkerOutcome::Clean;
                        }
                        (Ok(()), RunCompletion::AwaitDirective) => {
                            info!("run entry finished, waiting for directives");
                        }
                        (Err(err), _) => {
                            error!(error = %err, label = err.as_label(), "run entry failed");
                            break WorkerOutcome::Failure;
                        }
                    }
                }
            }
        };

        token.cancel();
        for task in [run_task, hook_task].into_iter().flatten() {
            task.abort();
        }
        outcome
    }

    fn start_hook(&self, signal: ShutdownSignal) -> EntryTask {
        let hook = Arc::clone(self.hook.as_ref()?);
        let id = self.id;
        info!(signal = signal.name(), "running shutdown hook");
        Some(tokio::spawn(async move { hook.shutdown(id, signal).await }))
    }
}

/// Awaits the task if there is one; pending forever otherwise.
///
/// Clears the slot on completion so a finished handle is never polled again.
async fn join_entry(task: &mut EntryTask) -> Result<(), EntryError> {
    let Some(handle) = task.as_mut() else {
        return std::future::pending().await;
    };
    let res = handle.await;
    *task = None;
    res.unwrap_or_else(|err| Err(join_failure(err)))
}
