mod support;

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use poolvisor::{
    BackoffPolicy, Directive, EntryError, Event, EventKind, HookFn, HookRef, JitterPolicy, Pool,
    PoolBuilder, RevivePolicy, RunFn, RunRef, ShutdownSignal, WorkerId, WorkerOutcome,
};
use tokio::sync::broadcast;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use support::{Journal, MemorySpawner};

fn idle_run() -> RunRef {
    RunFn::arc(|_id: WorkerId, ctx: CancellationToken| async move {
        ctx.cancelled().await;
        Ok::<_, EntryError>(())
    })
}

/// Fails the first `crashes` invocations right after start, then idles.
fn crashing_run(crashes: usize) -> RunRef {
    let started = Arc::new(AtomicUsize::new(0));
    RunFn::arc(move |_id: WorkerId, ctx: CancellationToken| {
        let n = started.fetch_add(1, Ordering::SeqCst);
        async move {
            if n < crashes {
                return Err(EntryError::fail("crashed on start"));
            }
            ctx.cancelled().await;
            Ok(())
        }
    })
}

fn quiet(builder: PoolBuilder) -> Pool {
    builder.with_subscribers(Vec::new()).build().unwrap()
}

fn drain_events(rx: &mut broadcast::Receiver<Event>) -> Vec<Event> {
    let mut out = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        out.push(ev);
    }
    out
}

async fn settle() {
    tokio::time::sleep(Duration::from_millis(10)).await;
}

#[tokio::test(start_paused = true)]
async fn test_term_drains_three_workers_without_hook() {
    let pool = quiet(Pool::builder(idle_run()).workers(3));
    let (spawner, journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();
    let running = tokio::spawn(sup.run());

    settle().await;
    assert!(handle.shutdown(ShutdownSignal::Term));
    let report = running.await.unwrap().unwrap();

    assert_eq!(report.signal, Some(ShutdownSignal::Term));
    assert_eq!(report.forked, 3);
    assert!(!report.forced);
    for id in 1..=3 {
        assert_eq!(
            Journal::directives_for(&journal, WorkerId::new(id)),
            vec![Directive::shutdown(ShutdownSignal::Term)]
        );
    }
    let outcomes = Journal::outcomes(&journal);
    assert_eq!(outcomes.len(), 3);
    assert!(outcomes.iter().all(|(_, o)| *o == WorkerOutcome::Clean));
}

#[tokio::test(start_paused = true)]
async fn test_failing_hook_exits_one_but_pool_still_drains() {
    let calls = Arc::new(AtomicUsize::new(0));
    let hook: HookRef = {
        let calls = Arc::clone(&calls);
        HookFn::arc(move |_id: WorkerId, signal: ShutdownSignal| {
            calls.fetch_add(1, Ordering::SeqCst);
            async move { Err::<(), _>(EntryError::fail(format!("cannot flush on {signal}"))) }
        })
    };
    let pool = quiet(
        Pool::builder(idle_run())
            .workers(2)
            .timeout(Duration::from_millis(100))
            .shutdown_hook(hook),
    );
    let (spawner, journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();
    let running = tokio::spawn(sup.run());

    settle().await;
    let started = Instant::now();
    handle.shutdown(ShutdownSignal::Int);
    let report = running.await.unwrap().unwrap();

    assert!(started.elapsed() < Duration::from_millis(100));
    assert!(!report.forced);
    assert_eq!(calls.load(Ordering::SeqCst), 2);
    assert_eq!(
        Journal::outcomes(&journal),
        vec![
            (WorkerId::new(1), WorkerOutcome::Failure),
            (WorkerId::new(2), WorkerOutcome::Failure),
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn test_stuck_hook_is_forced_after_timeout() {
    let hook: HookRef = HookFn::arc(|_id: WorkerId, _signal: ShutdownSignal| async {
        std::future::pending::<()>().await;
        Ok::<_, EntryError>(())
    });
    let pool = quiet(
        Pool::builder(idle_run())
            .workers(1)
            .timeout(Duration::from_millis(50))
            .shutdown_hook(hook),
    );
    let (spawner, journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();
    let running = tokio::spawn(sup.run());

    settle().await;
    let started = Instant::now();
    handle.shutdown(ShutdownSignal::Term);
    let report = running.await.unwrap().unwrap();

    let elapsed = started.elapsed();
    assert!(elapsed >= Duration::from_millis(50), "{elapsed:?}");
    assert!(elapsed < Duration::from_millis(60), "{elapsed:?}");
    assert!(report.forced);
    assert_eq!(
        Journal::directives_for(&journal, WorkerId::new(1)),
        vec![
            Directive::shutdown(ShutdownSignal::Term),
            Directive::ForceShutdown
        ]
    );
    assert_eq!(
        Journal::outcomes(&journal),
        vec![(WorkerId::new(1), WorkerOutcome::Failure)]
    );
}

#[tokio::test(start_paused = true)]
async fn test_second_trigger_sends_nothing() {
    let pool = quiet(
        Pool::builder(idle_run())
            .workers(2)
            .shutdown_hook(HookFn::arc(|_id: WorkerId, _signal: ShutdownSignal| async {
                tokio::time::sleep(Duration::from_millis(20)).await;
                Ok::<_, EntryError>(())
            })),
    );
    let (spawner, journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();
    let mut events = handle.subscribe();
    let running = tokio::spawn(sup.run());

    settle().await;
    handle.shutdown(ShutdownSignal::Term);
    handle.shutdown(ShutdownSignal::Int);
    let report = running.await.unwrap().unwrap();

    assert_eq!(report.signal, Some(ShutdownSignal::Term));
    assert_eq!(journal.lock().unwrap().directives.len(), 2);
    let kinds: Vec<EventKind> = drain_events(&mut events).iter().map(|e| e.kind).collect();
    assert_eq!(
        kinds.iter().filter(|k| **k == EventKind::ShutdownRequested).count(),
        1
    );
    assert!(kinds.contains(&EventKind::ShutdownIgnored));
}

#[tokio::test(start_paused = true)]
async fn test_crashed_workers_are_revived_until_pool_is_full() {
    let pool = quiet(Pool::builder(crashing_run(2)).workers(3));
    let (spawner, journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();
    let mut events = handle.subscribe();
    let running = tokio::spawn(sup.run());

    tokio::time::sleep(Duration::from_secs(1)).await;
    handle.shutdown(ShutdownSignal::Term);
    let report = running.await.unwrap().unwrap();

    assert_eq!(report.forked, 5);
    assert_eq!(report.revived, 2);
    let requested = drain_events(&mut events)
        .into_iter()
        .find(|e| e.kind == EventKind::ShutdownRequested)
        .unwrap();
    assert_eq!(requested.live, Some(3));

    let outcomes = Journal::outcomes(&journal);
    let failures = outcomes
        .iter()
        .filter(|(_, o)| *o == WorkerOutcome::Failure)
        .count();
    assert_eq!((outcomes.len(), failures), (5, 2));
}

#[tokio::test(start_paused = true)]
async fn test_no_replacement_forked_once_shutdown_started() {
    let run = RunFn::arc(|_id: WorkerId, _ctx: CancellationToken| async {
        tokio::time::sleep(Duration::from_millis(100)).await;
        Err::<(), _>(EntryError::fail("crashed"))
    });
    let pool = quiet(Pool::builder(run).workers(2));
    let (spawner, _journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();
    let mut events = handle.subscribe();
    let running = tokio::spawn(sup.run());

    tokio::time::sleep(Duration::from_millis(100)).await;
    handle.shutdown(ShutdownSignal::Term);
    running.await.unwrap().unwrap();

    let events = drain_events(&mut events);
    let requested = events
        .iter()
        .find(|e| e.kind == EventKind::ShutdownRequested)
        .map(|e| e.seq)
        .unwrap();
    assert!(
        events
            .iter()
            .filter(|e| e.kind == EventKind::WorkerForked)
            .all(|e| e.seq < requested)
    );
    assert_eq!(events.last().map(|e| e.kind), Some(EventKind::PoolDrained));
}

#[tokio::test(start_paused = true)]
async fn test_backoff_spaces_out_revives() {
    let backoff = BackoffPolicy {
        first: Duration::from_millis(100),
        max: Duration::from_secs(1),
        factor: 2.0,
        jitter: JitterPolicy::None,
    };
    let pool = quiet(
        Pool::builder(crashing_run(3))
            .workers(1)
            .revive(RevivePolicy::Backoff(backoff)),
    );
    let (spawner, _journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();
    let mut events = handle.subscribe();
    let running = tokio::spawn(sup.run());

    tokio::time::sleep(Duration::from_secs(2)).await;
    handle.shutdown(ShutdownSignal::Term);
    let report = running.await.unwrap().unwrap();

    assert_eq!(report.revived, 3);
    let delays: Vec<u32> = drain_events(&mut events)
        .iter()
        .filter(|e| e.kind == EventKind::ReviveScheduled)
        .filter_map(|e| e.delay_ms)
        .collect();
    assert_eq!(delays, vec![100, 200, 400]);
}

#[tokio::test(start_paused = true)]
async fn test_worker_forked_before_shutdown_still_gets_directive() {
    let pool = quiet(Pool::builder(idle_run()).workers(2));
    let (spawner, journal) = MemorySpawner::new(pool.config());
    let sup = pool.supervisor(spawner).unwrap();
    let handle = sup.handle();

    // Queued ahead of every online report.
    handle.shutdown(ShutdownSignal::Hup);
    let report = sup.run().await.unwrap();

    assert_eq!(report.signal, Some(ShutdownSignal::Hup));
    for id in 1..=2 {
        let got = Journal::directives_for(&journal, WorkerId::new(id));
        assert!(!got.is_empty());
        assert!(
            got.iter()
                .all(|d| *d == Directive::shutdown(ShutdownSignal::Hup))
        );
    }
    assert_eq!(
        Journal::outcomes(&journal),
        vec![
            (WorkerId::new(1), WorkerOutcome::Clean),
            (WorkerId::new(2), WorkerOutcome::Clean),
        ]
    );
}
