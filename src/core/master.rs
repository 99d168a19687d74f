//! # Master supervisor state machine.
//!
//! [`Master`] is the explicit context object behind every master-side
//! callback. It is owned by exactly one task (the supervisor loop), so the
//! worker registry and [`SupervisorState`] are mutated without locks; each
//! callback runs to completion before the next event is looked at.
//!
//! ```text
//! PoolEvent                 callback              effect
//! ─────────                 ────────              ──────
//! Online(id)           ──►  on_online         ──► live += 1; late directive if shutting down
//! Exited(id, exit)     ──►  on_exit           ──► live -= 1 (if it was online); handle removed
//!                                                 Running  → revive (policy)
//!                                                 otherwise→ Drained once no handle remains
//! Shutdown(signal)     ──►  shutdown_workers  ──► first call only: Graceful, Shutdown{signal}
//!                                                 to every handle, arm timeout
//! GraceElapsed         ──►  on_grace_elapsed  ──► still Graceful: Forced, ForceShutdown to every handle
//! ReviveDue            ──►  on_revive_due     ──► still Running: fork replacement
//! ```
//!
//! ## Timers
//! The shutdown timeout and delayed revives are detached `sleep` tasks that
//! post back into the loop. They never decide anything themselves: the callback
//! re-checks the phase when they fire. Once the pool drains they are aborted so
//! nothing keeps the runtime busy.

use std::time::Duration;

use tokio::task::JoinHandle;

use crate::core::config::PoolConfig;
use crate::core::registry::{Registry, WorkerHandle, WorkerId};
use crate::core::state::{ShutdownPhase, SupervisorState};
use crate::error::RuntimeError;
use crate::events::{Bus, Event, EventKind};
use crate::policies::RevivePolicy;
use crate::process::{Notifier, Spawn, WorkerExit};
use crate::protocol::Directive;
use crate::signal::ShutdownSignal;

/// Delay before retrying a revive whose fork failed.
pub const FORK_RETRY_DELAY: Duration = Duration::from_secs(1);

/// Inputs of the supervisor loop.
#[derive(Debug)]
pub(crate) enum PoolEvent {
    Online(WorkerId),
    Exited(WorkerId, WorkerExit),
    Shutdown(ShutdownSignal),
    GraceElapsed,
    ReviveDue,
}

/// Whether the loop keeps going after a callback.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Flow {
    Continue,
    Drained,
}

/// Summary of a pool's lifetime, returned once it has drained.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PoolReport {
    /// Signal that started the shutdown.
    pub signal: Option<ShutdownSignal>,
    /// Whether the timeout elapsed and force directives were sent.
    pub forced: bool,
    /// Workers forked over the pool's lifetime, replacements included.
    pub forked: u64,
    /// Replacements forked for unexpected deaths.
    pub revived: u64,
}

pub(crate) struct Master<S> {
    workers: usize,
    timeout: Duration,
    revive: RevivePolicy,

    state: SupervisorState,
    registry: Registry,
    spawner: S,
    bus: Bus,
    notifier: Notifier,

    /// Consecutive unexpected deaths of workers that never proved stable.
    streak: u32,
    timers: Vec<JoinHandle<()>>,

    forced: bool,
    forked: u64,
    revived: u64,
}

impl<S: Spawn> Master<S> {
    pub(crate) fn new(cfg: &PoolConfig, spawner: S, bus: Bus, notifier: Notifier) -> Self {
        Self {
            workers: cfg.workers,
            timeout: cfg.timeout,
            revive: cfg.revive,
            state: SupervisorState::default(),
            registry: Registry::new(),
            spawner,
            bus,
            notifier,
            streak: 0,
            timers: Vec::new(),
            forced: false,
            forked: 0,
            revived: 0,
        }
    }

    #[cfg(test)]
    pub(crate) fn state(&self) -> &SupervisorState {
        &self.state
    }

    pub(crate) fn report(&self) -> PoolReport {
        PoolReport {
            signal: self.state.signal(),
            forced: self.forced,
            forked: self.forked,
            revived: self.revived,
        }
    }

    /// Forks the initial pool. Any fork failure here is fatal.
    pub(crate) fn start(&mut self) -> Result<(), RuntimeError> {
        for _ in 0..self.workers {
            self.fork().map_err(|(worker, err)| RuntimeError::Spawn {
                worker,
                reason: err.to_string(),
            })?;
        }
        Ok(())
    }

    /// Routes one loop input to its callback.
    pub(crate) fn handle(&mut self, ev: PoolEvent) -> Flow {
        match ev {
            PoolEvent::Online(id) => {
                self.on_online(id);
                Flow::Continue
            }
            PoolEvent::Exited(id, exit) => self.on_exit(id, exit),
            PoolEvent::Shutdown(signal) => self.shutdown_workers(signal),
            PoolEvent::GraceElapsed => {
                self.on_grace_elapsed();
                Flow::Continue
            }
            PoolEvent::ReviveDue => {
                self.on_revive_due();
                Flow::Continue
            }
        }
    }

    pub(crate) fn on_online(&mut self, id: WorkerId) {
        let Some(handle) = self.registry.mark_online(id) else {
            return;
        };
        self.state.worker_online();
        self.bus.publish(
            Event::new(EventKind::WorkerOnline)
                .with_worker(id)
                .with_live(self.state.live()),
        );

        // A worker that raced online past a shutdown decision gets the phase's directive.
        let late = match self.state.phase() {
            ShutdownPhase::Graceful => self.state.signal().map(Directive::shutdown),
            ShutdownPhase::Forced => Some(Directive::ForceShutdown),
            ShutdownPhase::Running | ShutdownPhase::Drained => None,
        };
        if let Some(directive) = late {
            deliver(&self.bus, handle, &directive);
        }
    }

    pub(crate) fn on_exit(&mut self, id: WorkerId, exit: WorkerExit) -> Flow {
        let Some(handle) = self.registry.remove(id) else {
            return Flow::Continue;
        };
        let stable = handle
            .online_since
            .is_some_and(|since| since.elapsed() >= self.revive.stable_after());
        self.state.worker_gone(handle.is_online());
        drop(handle);
        self.bus.publish(
            Event::new(EventKind::WorkerExited)
                .with_worker(id)
                .with_exit(exit)
                .with_live(self.state.live()),
        );

        if self.state.phase().is_running() {
            if stable {
                self.streak = 0;
            }
            self.schedule_revive(id);
            return Flow::Continue;
        }
        self.drain_if_empty()
    }

    /// Starts the shutdown protocol; every call after the first is a no-op.
    pub(crate) fn shutdown_workers(&mut self, signal: ShutdownSignal) -> Flow {
        if !self.state.begin_shutdown(signal) {
            self.bus
                .publish(Event::new(EventKind::ShutdownIgnored).with_signal(signal));
            return Flow::Continue;
        }
        self.bus.publish(
            Event::new(EventKind::ShutdownRequested)
                .with_signal(signal)
                .with_live(self.state.live()),
        );

        if self.registry.is_empty() {
            return self.drain_if_empty();
        }
        self.broadcast(&Directive::shutdown(signal));
        self.schedule(self.timeout, PoolEvent::GraceElapsed);
        Flow::Continue
    }

    pub(crate) fn on_grace_elapsed(&mut self) {
        if !self.state.advance(ShutdownPhase::Forced) {
            return;
        }
        self.forced = true;
        self.bus.publish(
            Event::new(EventKind::GraceExceeded)
                .with_delay(self.timeout)
                .with_live(self.state.live()),
        );
        self.broadcast(&Directive::ForceShutdown);
    }

    pub(crate) fn on_revive_due(&mut self) {
        if !self.state.phase().is_running() {
            return;
        }
        match self.fork() {
            Ok(_) => self.revived += 1,
            Err(_) => self.schedule(FORK_RETRY_DELAY, PoolEvent::ReviveDue),
        }
    }

    fn schedule_revive(&mut self, dead: WorkerId) {
        let delay = self.revive.delay(self.streak);
        self.streak = self.streak.saturating_add(1);
        self.bus.publish(
            Event::new(EventKind::ReviveScheduled)
                .with_worker(dead)
                .with_delay(delay),
        );

        if delay.is_zero() {
            self.on_revive_due();
        } else {
            self.schedule(delay, PoolEvent::ReviveDue);
        }
    }

    fn fork(&mut self) -> Result<WorkerId, (WorkerId, std::io::Error)> {
        let id = self.registry.allocate();
        match self.spawner.spawn(id, self.notifier.clone()) {
            Ok(link) => {
                let pid = link.pid();
                self.registry.insert(WorkerHandle::new(id, link));
                self.forked += 1;
                self.bus.publish(
                    Event::new(EventKind::WorkerForked)
                        .with_worker(id)
                        .with_pid(pid),
                );
                Ok(id)
            }
            Err(err) => {
                self.bus.publish(
                    Event::new(EventKind::ForkFailed)
                        .with_worker(id)
                        .with_reason(err.to_string()),
                );
                Err((id, err))
            }
        }
    }

    /// Sends to every handle, online or still starting.
    fn broadcast(&self, directive: &Directive) {
        for handle in self.registry.iter() {
            deliver(&self.bus, handle, directive);
        }
    }

    fn drain_if_empty(&mut self) -> Flow {
        if !self.registry.is_empty() || !self.state.advance(ShutdownPhase::Drained) {
            return Flow::Continue;
        }
        for timer in self.timers.drain(..) {
            timer.abort();
        }
        let mut ev = Event::new(EventKind::PoolDrained);
        ev.signal = self.state.signal();
        self.bus.publish(ev);
        Flow::Drained
    }

    fn schedule(&mut self, delay: Duration, ev: PoolEvent) {
        self.timers.retain(|t| !t.is_finished());
        let notifier = self.notifier.clone();
        self.timers.push(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            notifier.post(ev);
        }));
    }
}

fn deliver(bus: &Bus, handle: &WorkerHandle, directive: &Directive) {
    let mut ev = match handle.link.send(directive) {
        Ok(()) => Event::new(EventKind::DirectiveSent).with_reason(directive.label()),
        Err(err) => Event::new(EventKind::DirectiveFailed)
            .with_reason(format!("{}: {err}", directive.label())),
    };
    ev = ev.with_worker(handle.id);
    if let Directive::Shutdown { signal } = directive {
        ev = ev.with_signal(*signal);
    }
    bus.publish(ev);
}
