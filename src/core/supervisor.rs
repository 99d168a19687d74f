//! # Supervisor: the master's event loop.
//!
//! The [`Supervisor`] owns the [`Master`] context and drives it from a single
//! task. Every input, whatever its origin, is funnelled into one queue:
//!
//! ```text
//! Spawn impl ── Notifier::online / exited ──┐
//! timers ────── GraceElapsed / ReviveDue ───┼──► mpsc ──► Supervisor::run ──► Master::handle
//! PoolHandle ── shutdown(signal) ───────────┘                                     │
//!                                                                                 ▼
//!                                              Bus ──► subscriber listener ──► SubscriberSet
//! ```
//!
//! - The subscriber listener is attached before the first fork, so no event is missed.
//! - `run` resolves with a [`PoolReport`] once the pool has drained; the
//!   listener is flushed first, so subscribers have seen `PoolDrained` by then.
//! - OS signals are not wired here; [`Pool`](crate::Pool) forwards them through a
//!   [`PoolHandle`]. Embedders can do the same with their own triggers.
//!
//! ## Example
//! ```rust,no_run
//! use poolvisor::{EntryError, ExecSpawner, Pool, RunFn, ShutdownSignal};
//! use tokio_util::sync::CancellationToken;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let run = RunFn::arc(|_id, ctx: CancellationToken| async move {
//!         ctx.cancelled().await;
//!         Ok::<_, EntryError>(())
//!     });
//!     let pool = Pool::builder(run).workers(2).build()?;
//!     let sup = pool.supervisor(ExecSpawner::current_exe()?)?;
//!
//!     let handle = sup.handle();
//!     tokio::spawn(async move {
//!         tokio::time::sleep(std::time::Duration::from_secs(5)).await;
//!         handle.shutdown(ShutdownSignal::Term);
//!     });
//!
//!     let report = sup.run().await?;
//!     println!("drained after {} forks", report.forked);
//!     Ok(())
//! }
//! ```

use std::sync::Arc;

use tokio::sync::{broadcast, mpsc};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::warn;

use crate::core::config::PoolConfig;
use crate::core::master::{Flow, Master, PoolEvent, PoolReport};
use crate::error::{ConfigError, RuntimeError};
use crate::events::{Bus, Event};
use crate::process::{Notifier, Spawn};
use crate::signal::ShutdownSignal;
use crate::subscribers::{Subscribe, SubscriberSet};

/// Runs the master state machine for one pool.
pub struct Supervisor<S> {
    master: Master<S>,
    rx: mpsc::UnboundedReceiver<PoolEvent>,
    notifier: Notifier,
    bus: Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
}

impl<S: Spawn> Supervisor<S> {
    /// Validates `cfg` and prepares the loop; nothing is forked until [`run`](Self::run).
    pub fn new(
        cfg: &PoolConfig,
        spawner: S,
        subscribers: Vec<Arc<dyn Subscribe>>,
    ) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let bus = Bus::new(cfg.bus_capacity);
        let (tx, rx) = mpsc::unbounded_channel();
        let notifier = Notifier::new(tx);
        let master = Master::new(cfg, spawner, bus.clone(), notifier.clone());

        Ok(Self {
            master,
            rx,
            notifier,
            bus,
            subscribers,
        })
    }

    /// Handle for triggering shutdown and observing events.
    pub fn handle(&self) -> PoolHandle {
        PoolHandle {
            notifier: self.notifier.clone(),
            bus: self.bus.clone(),
        }
    }

    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Forks the pool and serves events until it drains.
    ///
    /// Fails only when the initial fork fails; afterwards the pool is kept
    /// alive until a shutdown completes.
    pub async fn run(self) -> Result<PoolReport, RuntimeError> {
        let Self {
            mut master,
            mut rx,
            notifier,
            bus,
            subscribers,
        } = self;
        drop(notifier);

        let done = CancellationToken::new();
        let listener = subscriber_listener(&bus, subscribers, done.clone());

        let started = master.start();
        if started.is_ok() {
            while let Some(ev) = rx.recv().await {
                if master.handle(ev) == Flow::Drained {
                    break;
                }
            }
        }

        done.cancel();
        let _ = listener.await;
        started.map(|()| master.report())
    }
}

/// Forwards bus events into the subscriber set until `done`, then flushes it.
fn subscriber_listener(
    bus: &Bus,
    subscribers: Vec<Arc<dyn Subscribe>>,
    done: CancellationToken,
) -> JoinHandle<()> {
    let mut rx = bus.subscribe();
    let set = SubscriberSet::new(subscribers, bus.clone());

    tokio::spawn(async move {
        loop {
            tokio::select! {
                biased;
                ev = rx.recv() => match ev {
                    Ok(ev) => set.emit(ev),
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "subscriber listener lagged behind the bus");
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                },
                _ = done.cancelled() => {
                    loop {
                        match rx.try_recv() {
                            Ok(ev) => set.emit(ev),
                            Err(broadcast::error::TryRecvError::Lagged(_)) => continue,
                            Err(_) => break,
                        }
                    }
                    break;
                }
            }
        }
        set.shutdown().await;
    })
}

/// Cloneable handle to a running [`Supervisor`].
#[derive(Clone, Debug)]
pub struct PoolHandle {
    notifier: Notifier,
    bus: Bus,
}

impl PoolHandle {
    /// Requests a pool shutdown attributed to `signal`.
    ///
    /// Only the first request of a pool's lifetime takes effect. Returns `false`
    /// once the supervisor has stopped.
    pub fn shutdown(&self, signal: ShutdownSignal) -> bool {
        self.notifier.post(PoolEvent::Shutdown(signal))
    }

    /// Subscribes to the pool's event bus.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.bus.subscribe()
    }
}
