//! # Default subscriber rendering events through `tracing`.
//!
//! Installed by [`PoolBuilder`](crate::PoolBuilder) unless replaced with
//! `with_subscribers`. Levels:
//!
//! | Level | Events |
//! |-------|--------|
//! | info  | forked, online, exited, revive scheduled, shutdown requested, drained |
//! | warn  | fork failed, directive failed, grace exceeded, subscriber overflow/panic |
//! | debug | directive sent, duplicate shutdown ignored |

use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Logs every supervisor event with structured fields.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let worker = e.worker.map(|w| w.get());
        let signal = e.signal.map(|s| s.name());
        let reason = e.reason.as_deref();

        match e.kind {
            EventKind::WorkerForked => info!(worker, pid = e.pid, "worker forked"),
            EventKind::ForkFailed => warn!(worker, reason, "fork failed"),
            EventKind::WorkerOnline => info!(worker, live = e.live, "worker online"),
            EventKind::WorkerExited => {
                let exit = e.exit.map(|x| x.to_string());
                info!(worker, exit = exit.as_deref(), live = e.live, "worker exited")
            }
            EventKind::ReviveScheduled => {
                info!(worker, delay_ms = e.delay_ms, "reviving worker")
            }
            EventKind::ShutdownRequested => {
                info!(signal, live = e.live, "shutting down workers")
            }
            EventKind::ShutdownIgnored => debug!(signal, "shutdown already in progress"),
            EventKind::DirectiveSent => debug!(worker, directive = reason, "directive sent"),
            EventKind::DirectiveFailed => warn!(worker, reason, "directive not delivered"),
            EventKind::GraceExceeded => warn!(
                timeout_ms = e.delay_ms,
                live = e.live,
                "shutdown timeout exceeded, forcing workers"
            ),
            EventKind::PoolDrained => info!(signal, "all workers exited"),
            EventKind::SubscriberPanicked => {
                warn!(subscriber = e.source, reason, "subscriber panicked")
            }
            EventKind::SubscriberOverflow => {
                warn!(subscriber = e.source, reason, "subscriber dropped event")
            }
        }
    }

    fn name(&self) -> &'static str {
        "log-writer"
    }
}
