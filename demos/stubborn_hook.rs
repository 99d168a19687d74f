//! # Demo: forced shutdown
//!
//! Two workers whose shutdown hook blocks forever. After the 500ms timeout the
//! master escalates to `ForceShutdown` and both workers exit with status 1;
//! the master still exits 0 once the pool has drained.
//!
//! A custom subscriber prints the protocol steps next to the default log output.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use poolvisor::{
    EntryError, Event, EventKind, HookFn, LogWriter, Pool, RunFn, ShutdownSignal, Subscribe,
    WorkerId,
};
use tokio_util::sync::CancellationToken;

struct Milestones;

#[async_trait]
impl Subscribe for Milestones {
    async fn on_event(&self, e: &Event) {
        match e.kind {
            EventKind::ShutdownRequested => println!("[master] graceful shutdown ({:?})", e.signal),
            EventKind::GraceExceeded => println!("[master] timeout after {:?}ms, forcing", e.delay_ms),
            EventKind::WorkerExited => println!("[master] worker {:?} exited: {:?}", e.worker, e.exit),
            EventKind::PoolDrained => println!("[master] drained"),
            _ => {}
        }
    }

    fn name(&self) -> &'static str {
        "milestones"
    }
}

fn main() {
    let run = RunFn::arc(|_id: WorkerId, ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, EntryError>(())
    });

    let hook = HookFn::blocking(|id: WorkerId, signal: ShutdownSignal| {
        println!("[worker {id}] got {signal}, refusing to finish");
        loop {
            std::thread::sleep(Duration::from_secs(60));
        }
    });

    let pool = Pool::builder(run)
        .workers(2)
        .timeout(Duration::from_millis(500))
        .shutdown_hook(hook)
        .with_subscribers(vec![
            Arc::new(LogWriter) as Arc<dyn Subscribe>,
            Arc::new(Milestones) as Arc<dyn Subscribe>,
        ])
        .build();

    match pool {
        Ok(pool) => pool.launch(),
        Err(err) => {
            eprintln!("invalid pool configuration: {err}");
            std::process::exit(2);
        }
    }
}
