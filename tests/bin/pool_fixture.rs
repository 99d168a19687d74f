//! Pool binary for the process-level tests in `tests/launch.rs`.
//!
//! The executable is both master and workers. `POOL_FIXTURE_MODE` picks the
//! entries, `POOL_FIXTURE_DIR` collects marker files:
//! - `online-<id>`: worker `<id>`'s pid, written once its run entry starts;
//! - `exit-<id>`: written by the master, the worker's exit code (or `signal <n>`).
//!
//! | Mode         | Run entry                    | Hook                | Timeout |
//! |--------------|------------------------------|---------------------|---------|
//! | `graceful`   | async, waits for cancel      | none                | 5s      |
//! | `stuck-hook` | async, waits for cancel      | blocking, never ends| 200ms   |
//! | `stuck-run`  | blocking, ignores cancel     | none                | 5s      |

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use poolvisor::{
    EntryError, Event, EventKind, HookFn, LogWriter, Pool, PoolBuilder, RunFn, RunRef,
    ShutdownSignal, Subscribe, WorkerExit, WorkerId,
};
use tokio_util::sync::CancellationToken;

const MODE_ENV: &str = "POOL_FIXTURE_MODE";
const DIR_ENV: &str = "POOL_FIXTURE_DIR";

/// Records every worker exit as a marker file.
struct ExitRecorder {
    dir: PathBuf,
}

#[async_trait]
impl Subscribe for ExitRecorder {
    async fn on_event(&self, e: &Event) {
        if e.kind != EventKind::WorkerExited {
            return;
        }
        let (Some(id), Some(exit)) = (e.worker, e.exit) else {
            return;
        };
        let status = match exit {
            WorkerExit::Exited(code) => code.to_string(),
            WorkerExit::Signaled(sig) => format!("signal {sig}"),
            WorkerExit::Unknown => "unknown".to_string(),
        };
        if let Err(err) = std::fs::write(self.dir.join(format!("exit-{id}")), status) {
            eprintln!("[fixture] cannot record exit of worker {id}: {err}");
        }
    }

    fn name(&self) -> &'static str {
        "exit-recorder"
    }
}

fn mark_online(dir: &Path, id: WorkerId) -> Result<(), EntryError> {
    std::fs::write(dir.join(format!("online-{id}")), std::process::id().to_string())?;
    Ok(())
}

fn waiting_run(dir: PathBuf) -> RunRef {
    RunFn::arc(move |id: WorkerId, ctx: CancellationToken| {
        let marked = mark_online(&dir, id);
        async move {
            marked?;
            ctx.cancelled().await;
            Ok(())
        }
    })
}

fn stuck_run(dir: PathBuf) -> RunRef {
    RunFn::blocking(move |id: WorkerId, _ctx: CancellationToken| {
        mark_online(&dir, id)?;
        loop {
            std::thread::sleep(Duration::from_millis(50));
        }
    })
}

fn builder(mode: &str, dir: PathBuf) -> Option<PoolBuilder> {
    let builder = match mode {
        "graceful" => Pool::builder(waiting_run(dir)).timeout(Duration::from_secs(5)),
        "stuck-hook" => Pool::builder(waiting_run(dir))
            .timeout(Duration::from_millis(200))
            .shutdown_hook(HookFn::blocking(|_id: WorkerId, _signal: ShutdownSignal| {
                loop {
                    std::thread::sleep(Duration::from_millis(50));
                }
            })),
        "stuck-run" => Pool::builder(stuck_run(dir)).timeout(Duration::from_secs(5)),
        _ => return None,
    };
    Some(builder.workers(2))
}

#[cfg(not(unix))]
fn main() {
    eprintln!("[fixture] pools need a unix host");
    std::process::exit(2);
}

#[cfg(unix)]
fn main() {
    let (Ok(mode), Some(dir)) = (std::env::var(MODE_ENV), std::env::var_os(DIR_ENV)) else {
        eprintln!("[fixture] {MODE_ENV} and {DIR_ENV} must be set");
        std::process::exit(2);
    };
    let dir = PathBuf::from(dir);

    let Some(builder) = builder(&mode, dir.clone()) else {
        eprintln!("[fixture] unknown mode {mode:?}");
        std::process::exit(2);
    };
    let pool = builder
        .with_subscribers(vec![
            Arc::new(LogWriter) as Arc<dyn Subscribe>,
            Arc::new(ExitRecorder { dir }) as Arc<dyn Subscribe>,
        ])
        .build();

    match pool {
        Ok(pool) => pool.launch(),
        Err(err) => {
            eprintln!("[fixture] invalid pool configuration: {err}");
            std::process::exit(2);
        }
    }
}
