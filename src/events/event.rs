//! # Events emitted by the master supervisor.
//!
//! [`EventKind`] covers four groups:
//! - **Worker lifecycle**: forked, fork failed, online, exited, revive scheduled
//! - **Shutdown protocol**: requested, ignored duplicate, directive sent/failed,
//!   grace exceeded, drained
//! - **Subscriber health**: panicked, overflow
//!
//! [`Event`] carries the optional metadata relevant to its kind.
//!
//! ## Ordering
//! `seq` is process-wide and strictly increasing; use it to restore publication
//! order across subscribers.
//!
//! ## Example
//! ```rust
//! use poolvisor::{Event, EventKind, ShutdownSignal, WorkerId};
//!
//! let ev = Event::new(EventKind::DirectiveSent)
//!     .with_worker(WorkerId::new(2))
//!     .with_signal(ShutdownSignal::Term)
//!     .with_reason("shutdown");
//!
//! assert_eq!(ev.worker, Some(WorkerId::new(2)));
//! assert_eq!(ev.signal, Some(ShutdownSignal::Term));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::{Duration, SystemTime};

use crate::core::WorkerId;
use crate::process::WorkerExit;
use crate::signal::ShutdownSignal;

static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of supervisor events.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum EventKind {
    // === Worker lifecycle ===
    /// A worker process was forked.
    ///
    /// Sets: `worker`, `pid` (if known).
    WorkerForked,

    /// Forking a worker failed.
    ///
    /// Sets: `worker` (the id it would have had), `reason`.
    ForkFailed,

    /// A worker acknowledged it is running.
    ///
    /// Sets: `worker`, `live` (online count after the change).
    WorkerOnline,

    /// A worker process terminated.
    ///
    /// Sets: `worker`, `exit`, `live`.
    WorkerExited,

    /// A replacement for an unexpected death is scheduled.
    ///
    /// Sets: `worker` (the dead one), `delay_ms`.
    ReviveScheduled,

    // === Shutdown protocol ===
    /// Shutdown started; the first trigger wins.
    ///
    /// Sets: `signal`, `live`.
    ShutdownRequested,

    /// A trigger arrived while a shutdown was already in progress.
    ///
    /// Sets: `signal` (of the ignored trigger).
    ShutdownIgnored,

    /// A directive was handed to a worker's control channel.
    ///
    /// Sets: `worker`, `reason` (directive label), `signal` for graceful ones.
    DirectiveSent,

    /// A directive could not be handed to a worker's control channel.
    ///
    /// Sets: `worker`, `reason`.
    DirectiveFailed,

    /// The graceful window elapsed before the pool drained; force follows.
    ///
    /// Sets: `delay_ms` (the configured timeout), `live`.
    GraceExceeded,

    /// Every worker is gone; the supervisor loop ends.
    ///
    /// Sets: `signal`.
    PoolDrained,

    // === Subscriber health ===
    /// A subscriber panicked while handling an event.
    ///
    /// Sets: `source` (subscriber name), `reason`.
    SubscriberPanicked,

    /// An event was dropped for one subscriber.
    ///
    /// Sets: `source` (subscriber name), `reason` ("full" / "closed").
    SubscriberOverflow,
}

/// Supervisor event with optional metadata.
#[derive(Debug, Clone)]
pub struct Event {
    /// Process-wide, strictly increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,

    /// Worker the event is about.
    pub worker: Option<WorkerId>,
    /// OS process id of the worker.
    pub pid: Option<u32>,
    /// Shutdown signal involved.
    pub signal: Option<ShutdownSignal>,
    /// How a worker terminated.
    pub exit: Option<WorkerExit>,
    /// Online worker count after the event was applied.
    pub live: Option<usize>,
    /// Delay in milliseconds (revive delay, shutdown timeout).
    pub delay_ms: Option<u32>,
    /// Human-readable detail.
    pub reason: Option<Arc<str>>,
    /// Originating component for subscriber events.
    pub source: Option<&'static str>,
}

impl Event {
    /// Creates an event of the given kind, stamped with the time and the next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            worker: None,
            pid: None,
            signal: None,
            exit: None,
            live: None,
            delay_ms: None,
            reason: None,
            source: None,
        }
    }

    #[inline]
    pub fn with_worker(mut self, id: WorkerId) -> Self {
        self.worker = Some(id);
        self
    }

    #[inline]
    pub fn with_pid(mut self, pid: Option<u32>) -> Self {
        self.pid = pid;
        self
    }

    #[inline]
    pub fn with_signal(mut self, signal: ShutdownSignal) -> Self {
        self.signal = Some(signal);
        self
    }

    #[inline]
    pub fn with_exit(mut self, exit: WorkerExit) -> Self {
        self.exit = Some(exit);
        self
    }

    #[inline]
    pub fn with_live(mut self, live: usize) -> Self {
        self.live = Some(live);
        self
    }

    /// Attaches a delay (stored as milliseconds, saturating).
    #[inline]
    pub fn with_delay(mut self, d: Duration) -> Self {
        self.delay_ms = Some(d.as_millis().min(u128::from(u32::MAX)) as u32);
        self
    }

    #[inline]
    pub fn with_reason(mut self, reason: impl Into<Arc<str>>) -> Self {
        self.reason = Some(reason.into());
        self
    }

    /// Creates a subscriber overflow event.
    pub fn subscriber_overflow(subscriber: &'static str, reason: &'static str) -> Self {
        let mut ev = Event::new(EventKind::SubscriberOverflow).with_reason(reason);
        ev.source = Some(subscriber);
        ev
    }

    /// Creates a subscriber panic event.
    pub fn subscriber_panicked(subscriber: &'static str, info: String) -> Self {
        let mut ev = Event::new(EventKind::SubscriberPanicked).with_reason(info);
        ev.source = Some(subscriber);
        ev
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_seq_is_strictly_increasing() {
        let a = Event::new(EventKind::WorkerForked);
        let b = Event::new(EventKind::WorkerOnline);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_delay_saturates() {
        let ev = Event::new(EventKind::ReviveScheduled).with_delay(Duration::from_secs(u64::MAX));
        assert_eq!(ev.delay_ms, Some(u32::MAX));
    }

    #[test]
    fn test_subscriber_events_carry_source() {
        let ev = Event::subscriber_overflow("audit", "full");
        assert_eq!(ev.kind, EventKind::SubscriberOverflow);
        assert_eq!(ev.source, Some("audit"));
        assert_eq!(ev.reason.as_deref(), Some("full"));
    }
}
