//! In-memory pool: workers are tokio tasks running the real `WorkerRuntime`.
#![allow(dead_code)]

use std::io;
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use poolvisor::{
    ChannelError, Control, Directive, Notifier, PoolConfig, Report, Spawn, WorkerExit, WorkerId,
    WorkerLink, WorkerOutcome, WorkerRuntime,
};
use tokio::sync::mpsc;

/// What happened to the in-memory workers.
#[derive(Default)]
pub struct Journal {
    pub directives: Vec<(WorkerId, Directive)>,
    pub outcomes: Vec<(WorkerId, WorkerOutcome)>,
}

pub type SharedJournal = Arc<Mutex<Journal>>;

impl Journal {
    pub fn directives_for(journal: &SharedJournal, id: WorkerId) -> Vec<Directive> {
        journal
            .lock()
            .unwrap()
            .directives
            .iter()
            .filter(|(w, _)| *w == id)
            .map(|(_, d)| d.clone())
            .collect()
    }

    pub fn outcomes(journal: &SharedJournal) -> Vec<(WorkerId, WorkerOutcome)> {
        let mut out = journal.lock().unwrap().outcomes.clone();
        out.sort_by_key(|(id, _)| *id);
        out
    }
}

pub struct MemorySpawner {
    cfg: PoolConfig,
    journal: SharedJournal,
}

impl MemorySpawner {
    pub fn new(cfg: &PoolConfig) -> (Self, SharedJournal) {
        let journal = SharedJournal::default();
        let spawner = Self {
            cfg: cfg.clone(),
            journal: Arc::clone(&journal),
        };
        (spawner, journal)
    }
}

impl Spawn for MemorySpawner {
    fn spawn(&mut self, id: WorkerId, notifier: Notifier) -> io::Result<Box<dyn WorkerLink>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let control = MemoryControl {
            id,
            rx,
            notifier: notifier.clone(),
        };
        let runtime = WorkerRuntime::new(id, &self.cfg);
        let journal = Arc::clone(&self.journal);

        tokio::spawn(async move {
            let outcome = runtime.serve(control).await;
            journal.lock().unwrap().outcomes.push((id, outcome));
            notifier.exited(id, WorkerExit::Exited(outcome.code()));
        });

        Ok(Box::new(MemoryLink {
            id,
            tx,
            journal: Arc::clone(&self.journal),
        }))
    }
}

struct MemoryLink {
    id: WorkerId,
    tx: mpsc::UnboundedSender<Directive>,
    journal: SharedJournal,
}

impl WorkerLink for MemoryLink {
    fn send(&self, directive: &Directive) -> Result<(), ChannelError> {
        self.journal
            .lock()
            .unwrap()
            .directives
            .push((self.id, directive.clone()));
        self.tx
            .send(directive.clone())
            .map_err(|_| ChannelError::Closed)
    }
}

struct MemoryControl {
    id: WorkerId,
    rx: mpsc::UnboundedReceiver<Directive>,
    notifier: Notifier,
}

#[async_trait]
impl Control for MemoryControl {
    async fn recv(&mut self) -> Result<Option<Directive>, ChannelError> {
        Ok(self.rx.recv().await)
    }

    async fn report(&mut self, report: Report) -> Result<(), ChannelError> {
        if report == Report::Online {
            self.notifier.online(self.id);
        }
        Ok(())
    }
}
