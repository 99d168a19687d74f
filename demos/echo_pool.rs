//! # Demo: ticking worker pool
//!
//! Forks one worker per CPU (or `POOLVISOR_WORKERS`). Each worker ticks once a
//! second until shut down, then flushes in its shutdown hook.
//!
//! ```text
//! cargo run --example echo_pool
//! kill -TERM <master pid>     # or Ctrl-C
//! ```
//!
//! Kill a single worker with `kill -KILL <worker pid>` to watch it revive.

use std::time::Duration;

use poolvisor::{EntryError, HookFn, Pool, RunFn, ShutdownSignal, WorkerId};
use tokio_util::sync::CancellationToken;

fn main() {
    let run = RunFn::arc(|id: WorkerId, ctx: CancellationToken| async move {
        let mut ticks = 0u64;
        loop {
            tokio::select! {
                _ = ctx.cancelled() => break,
                _ = tokio::time::sleep(Duration::from_secs(1)) => {
                    ticks += 1;
                    println!("[worker {id}] tick {ticks} (pid {})", std::process::id());
                }
            }
        }
        println!("[worker {id}] stopped after {ticks} ticks");
        Ok::<_, EntryError>(())
    });

    let hook = HookFn::arc(|id: WorkerId, signal: ShutdownSignal| async move {
        println!("[worker {id}] flushing on {signal}");
        tokio::time::sleep(Duration::from_millis(200)).await;
        Ok::<_, EntryError>(())
    });

    let pool = Pool::builder(run)
        .timeout(Duration::from_secs(3))
        .shutdown_hook(hook)
        .with_env_overrides()
        .build();

    match pool {
        Ok(pool) => pool.launch(),
        Err(err) => {
            eprintln!("invalid pool configuration: {err}");
            std::process::exit(2);
        }
    }
}
