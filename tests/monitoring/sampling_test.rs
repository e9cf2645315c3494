/*!
 * Sampling Loop Tests
 */

use pretty_assertions::assert_eq;
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};
use threadwatch::monitoring::{LifecycleHandlers, SamplingLoop, WatchContext};
use threadwatch::{
    MemorySink, RecordKind, RingBuffer, SimulatedHost, StateCode, ThreadTable, ThreadWatcher, WatchConfig,
};

type Context = WatchContext<Arc<SimulatedHost>, ThreadTable<u64>>;

fn setup(capacity: usize) -> (Arc<Context>, Arc<SimulatedHost>) {
    let host = Arc::new(SimulatedHost::new());
    let context = Arc::new(WatchContext::new(
        WatchConfig::default(),
        Arc::clone(&host),
        ThreadTable::new(),
        Arc::new(RingBuffer::with_capacity(capacity).unwrap()),
    ));
    (context, host)
}

fn drain(context: &Context) -> Vec<threadwatch::Record> {
    std::iter::from_fn(|| context.buffer().pop()).collect()
}

#[test]
fn test_transition_and_back_yields_two_samples() {
    let (context, host) = setup(32);
    let handlers = LifecycleHandlers::new(Arc::clone(&context));

    for handle in 1..=5u64 {
        host.set_state(handle, StateCode::RUNNABLE);
        handlers.on_thread_created(handle, &format!("worker-{}", handle), false);
    }

    let mut sampling = SamplingLoop::new(Arc::clone(&context));
    assert_eq!(sampling.run_pass().changes, 5);
    drain(&context);

    host.set_state(5, StateCode::BLOCKED_ON_MONITOR_ENTER);
    sampling.run_pass();
    host.set_state(5, StateCode::RUNNABLE);
    sampling.run_pass();

    let samples: Vec<(u32, Option<StateCode>)> = drain(&context)
        .iter()
        .map(|r| (r.thread_id, r.state()))
        .collect();
    assert_eq!(
        samples,
        vec![
            (5, Some(StateCode::BLOCKED_ON_MONITOR_ENTER)),
            (5, Some(StateCode::RUNNABLE)),
        ]
    );
}

#[test]
fn test_unchanged_state_leaves_counters() {
    let (context, host) = setup(8);
    let handlers = LifecycleHandlers::new(Arc::clone(&context));
    host.set_state(1, StateCode::SLEEPING);
    handlers.on_thread_created(1, "sleeper", false);

    let mut sampling = SamplingLoop::new(Arc::clone(&context));
    sampling.run_pass();
    let before = context.buffer().stats();

    let report = sampling.run_pass();

    assert_eq!(report.visited, 1);
    assert_eq!(report.changes, 0);
    assert_eq!(context.buffer().stats(), before);
    assert_eq!(sampling.passes(), 2);
}

#[test]
fn test_end_record_follows_samples() {
    let (context, host) = setup(16);
    let handlers = LifecycleHandlers::new(Arc::clone(&context));
    host.set_state(3, StateCode::RUNNABLE);
    let id = handlers.on_thread_created(3, "short-lived", false).unwrap();

    let mut sampling = SamplingLoop::new(Arc::clone(&context));
    sampling.run_pass();
    handlers.on_thread_terminated(&3);
    let report = sampling.run_pass();

    assert_eq!(report.visited, 0);
    let kinds: Vec<RecordKind> = drain(&context).iter().map(|r| r.kind()).collect();
    assert_eq!(
        kinds,
        vec![
            RecordKind::ThreadStart,
            RecordKind::ThreadStateSample,
            RecordKind::ThreadEnd,
        ]
    );
    assert_eq!(host.released(), vec![3]);
    assert_eq!(id, 1);
}

#[test]
fn test_slow_queries_do_not_stall_handlers() {
    let host = Arc::new(SimulatedHost::new());
    let config = WatchConfig::default()
        .with_buffer_capacity(256)
        .with_max_delay(Duration::from_millis(1));
    let watcher = ThreadWatcher::start(config, Arc::clone(&host), MemorySink::new()).unwrap();
    let handlers = watcher.handlers();

    for handle in 1..=20u64 {
        host.set_state(handle, StateCode::RUNNABLE);
        handlers.on_thread_created(handle, &format!("worker-{}", handle), false);
    }
    // A full pass now takes 20 * 20ms
    host.set_query_delay(Duration::from_millis(20));
    let queries = host.query_count();
    while host.query_count() < queries + 2 {
        thread::yield_now();
    }

    let mut worst = Duration::ZERO;
    for handle in 100..105u64 {
        host.set_state(handle, StateCode::RUNNABLE);
        let started = Instant::now();
        assert!(handlers.on_thread_created(handle, "late", false).is_some());
        worst = worst.max(started.elapsed());
    }

    host.set_query_delay(Duration::ZERO);
    watcher.shutdown();
    assert!(worst < Duration::from_millis(100), "handler waited {:?}", worst);
}
