//! # Process primitives behind the supervisor.
//!
//! The master and worker state machines only talk to processes through the
//! traits here, so the forking primitive and the transport stay replaceable:
//!
//! ```text
//! master side                              worker side
//! ───────────                              ───────────
//! Spawn::spawn(id, Notifier) ──fork──►     Pool::run (role = worker)
//!   └─► Box<dyn WorkerLink>                  └─► Control
//! WorkerLink::send(Directive) ───────────►     Control::recv()
//! Notifier::online(id)        ◄───────────     Control::report(Online)
//! Notifier::exited(id, exit)  ◄── process termination observed
//! ```
//!
//! ## Rules
//! - `WorkerLink::send` never blocks; directives to one worker arrive in send order.
//! - A `Spawn` implementation reports exactly one `exited` per successful spawn,
//!   whatever the cause of termination.
//! - Dropping a `WorkerLink` closes the worker's control channel.
//!
//! [`ExecSpawner`] and [`ControlChannel`] are the unix implementation:
//! the current executable is re-executed with [`WORKER_ID_ENV`] set and a
//! socketpair end on fd 3, carrying line-delimited JSON.

mod exit;
#[cfg(unix)]
mod channel;
#[cfg(unix)]
mod exec;

pub use exit::WorkerExit;
#[cfg(unix)]
pub use channel::ControlChannel;
#[cfg(unix)]
pub use exec::ExecSpawner;

use async_trait::async_trait;
use tokio::sync::mpsc;

use crate::core::{PoolEvent, WorkerId};
use crate::error::ChannelError;
use crate::protocol::{Directive, Report};

/// Environment variable carrying the worker id; its presence selects the worker role.
pub const WORKER_ID_ENV: &str = "POOLVISOR_WORKER_ID";

/// Environment variable naming the control channel file descriptor.
pub const CONTROL_FD_ENV: &str = "POOLVISOR_CONTROL_FD";

/// Forks one worker.
pub trait Spawn: Send + 'static {
    /// Starts worker `id`. Online acknowledgements and the eventual
    /// termination must be reported through `notifier`.
    fn spawn(&mut self, id: WorkerId, notifier: Notifier) -> std::io::Result<Box<dyn WorkerLink>>;
}

/// Master-side handle to one worker's process and control channel.
pub trait WorkerLink: Send {
    /// Queues a directive for the worker without waiting for delivery.
    fn send(&self, directive: &Directive) -> Result<(), ChannelError>;

    /// OS process id, when there is one.
    fn pid(&self) -> Option<u32> {
        None
    }
}

/// Worker-side end of the control channel.
#[async_trait]
pub trait Control: Send {
    /// Next directive; `Ok(None)` once the master end is closed.
    ///
    /// Must be cancel safe: it is polled inside `select!`.
    async fn recv(&mut self) -> Result<Option<Directive>, ChannelError>;

    /// Sends a report to the master.
    async fn report(&mut self, report: Report) -> Result<(), ChannelError>;
}

/// Feeds worker lifecycle observations into the supervisor's event loop.
#[derive(Clone, Debug)]
pub struct Notifier {
    tx: mpsc::UnboundedSender<PoolEvent>,
}

impl Notifier {
    pub(crate) fn new(tx: mpsc::UnboundedSender<PoolEvent>) -> Self {
        Self { tx }
    }

    /// Worker `id` reports it is running.
    pub fn online(&self, id: WorkerId) {
        self.post(PoolEvent::Online(id));
    }

    /// Worker `id` terminated.
    pub fn exited(&self, id: WorkerId, exit: WorkerExit) {
        self.post(PoolEvent::Exited(id, exit));
    }

    /// Returns `false` once the supervisor loop is gone.
    pub(crate) fn post(&self, ev: PoolEvent) -> bool {
        self.tx.send(ev).is_ok()
    }
}
