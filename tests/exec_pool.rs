#![cfg(unix)]

use std::time::Duration;

use poolvisor::{
    EntryError, Event, EventKind, ExecSpawner, Pool, RunFn, ShutdownSignal, WorkerExit, WorkerId,
};
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

/// Speaks the control protocol on fd 3: reports online, then exits 0 on
/// `shutdown`, 1 on `forceShutdown`.
const OBEDIENT: &str = r#"
printf '{"type":"online"}\n' >&3
while read -r line <&3; do
    case "$line" in
        *forceShutdown*) exit 1 ;;
        *'"shutdown"'*) exit 0 ;;
    esac
done
exit 3
"#;

/// Reports online, then ignores graceful shutdown.
const STUBBORN: &str = r#"
printf '{"type":"online"}\n' >&3
while read -r line <&3; do
    case "$line" in
        *forceShutdown*) exit 1 ;;
    esac
done
exit 3
"#;

fn pool(workers: usize, timeout: Duration) -> Pool {
    let run = RunFn::arc(|_id: WorkerId, _ctx: CancellationToken| async {
        Ok::<_, EntryError>(())
    });
    Pool::builder(run)
        .workers(workers)
        .timeout(timeout)
        .with_subscribers(Vec::new())
        .build()
        .unwrap()
}

fn sh(script: &str) -> ExecSpawner {
    ExecSpawner::new("/bin/sh").arg("-c").arg(script)
}

async fn wait_for(rx: &mut broadcast::Receiver<Event>, kind: EventKind, count: usize) {
    let mut seen = 0;
    while seen < count {
        if rx.recv().await.unwrap().kind == kind {
            seen += 1;
        }
    }
}

fn exits(events: &mut broadcast::Receiver<Event>) -> Vec<WorkerExit> {
    let mut out = Vec::new();
    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::WorkerExited {
            out.extend(ev.exit);
        }
    }
    out
}

#[tokio::test]
async fn test_real_workers_exit_clean_on_shutdown() {
    let sup = pool(2, Duration::from_secs(5)).supervisor(sh(OBEDIENT)).unwrap();
    let handle = sup.handle();
    let mut online = handle.subscribe();
    let mut events = handle.subscribe();
    let running = tokio::spawn(sup.run());

    tokio::time::timeout(
        Duration::from_secs(10),
        wait_for(&mut online, EventKind::WorkerOnline, 2),
    )
    .await
    .unwrap();
    handle.shutdown(ShutdownSignal::Term);

    let report = tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(!report.forced);
    assert_eq!(exits(&mut events), vec![WorkerExit::Exited(0); 2]);
}

#[tokio::test]
async fn test_real_worker_forced_after_timeout() {
    let sup = pool(1, Duration::from_millis(200))
        .supervisor(sh(STUBBORN))
        .unwrap();
    let handle = sup.handle();
    let mut online = handle.subscribe();
    let mut events = handle.subscribe();
    let running = tokio::spawn(sup.run());

    tokio::time::timeout(
        Duration::from_secs(10),
        wait_for(&mut online, EventKind::WorkerOnline, 1),
    )
    .await
    .unwrap();
    handle.shutdown(ShutdownSignal::Int);

    let report = tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert!(report.forced);
    assert_eq!(exits(&mut events), vec![WorkerExit::Exited(1)]);
}

#[tokio::test]
async fn test_killed_worker_is_revived() {
    let sup = pool(1, Duration::from_secs(5)).supervisor(sh(OBEDIENT)).unwrap();
    let handle = sup.handle();
    let mut events = handle.subscribe();
    let running = tokio::spawn(sup.run());

    let pid = tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::WorkerForked {
                break ev.pid.unwrap();
            }
        }
    })
    .await
    .unwrap();
    // SAFETY: plain kill(2) on a child we forked.
    unsafe { libc::kill(pid as libc::pid_t, libc::SIGKILL) };

    tokio::time::timeout(Duration::from_secs(10), async {
        loop {
            let ev = events.recv().await.unwrap();
            if ev.kind == EventKind::WorkerOnline && ev.worker == Some(WorkerId::new(2)) {
                break;
            }
        }
    })
    .await
    .unwrap();
    handle.shutdown(ShutdownSignal::Term);

    let report = tokio::time::timeout(Duration::from_secs(10), running)
        .await
        .unwrap()
        .unwrap()
        .unwrap();
    assert_eq!((report.forked, report.revived), (2, 1));
}
