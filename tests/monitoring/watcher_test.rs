/*!
 * Thread Watcher Tests
 */

use std::collections::HashMap;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tempfile::TempDir;
use threadwatch::monitoring::{WriterHandle, WriterStats};
use threadwatch::{
    MemorySink, Record, RecordKind, RecordSink, Result, RingBuffer, SimulatedHost, StateCode,
    ThreadWatcher, TraceReader, WatchConfig,
};
use uuid::Uuid;

fn config() -> WatchConfig {
    WatchConfig::default()
        .with_buffer_capacity(1024)
        .with_max_delay(Duration::from_millis(4))
}

/// Sink that is slow enough for records to pile up in the buffer
#[derive(Clone)]
struct SlowSink {
    inner: MemorySink,
    delay: Duration,
}

impl RecordSink for SlowSink {
    fn append(&mut self, record: &Record) -> Result<()> {
        thread::sleep(self.delay);
        self.inner.append(record)
    }

    fn close(&mut self) -> Result<()> {
        self.inner.close()
    }
}

#[test]
fn test_writer_drains_pending_records_on_stop() {
    // Two usable slots
    let buffer = Arc::new(RingBuffer::with_capacity(3).unwrap());
    for id in 1..=3 {
        buffer.try_produce(|| Some(Record::thread_end(id).unwrap()));
    }
    assert_eq!(buffer.stats().pending, 2);

    let sink = MemorySink::new();
    let writer = WriterHandle::spawn(Arc::clone(&buffer), sink.clone(), Uuid::new_v4()).unwrap();
    let stats = writer.stop_and_join();

    assert_eq!(stats, WriterStats { appended: 2, failed: 0 });
    let ids: Vec<u32> = sink.records().iter().map(|r| r.thread_id).collect();
    assert_eq!(ids, vec![1, 2]);

    let final_stats = buffer.stats();
    assert_eq!(final_stats.dropped, 1);
    assert_eq!(final_stats.pending, 0);
}

#[test]
fn test_shutdown_waits_for_backlog() {
    let memory = MemorySink::new();
    let sink = SlowSink {
        inner: memory.clone(),
        delay: Duration::from_millis(1),
    };
    let watcher = ThreadWatcher::start(config(), SimulatedHost::new(), sink).unwrap();
    let handlers = watcher.handlers();

    for handle in 0..50u64 {
        handlers.on_thread_created(handle, &format!("burst-{}", handle), false);
    }

    let report = watcher.shutdown();

    assert_eq!(report.buffer.written, 50);
    assert_eq!(report.buffer.pending, 0);
    assert_eq!(report.writer.appended, 50);
    assert_eq!(memory.records().len(), 50);
    assert!(memory
        .records()
        .iter()
        .all(|r| r.kind() == RecordKind::ThreadStart));
}

#[test]
fn test_stats_and_tracked_threads_are_live() {
    let watcher = ThreadWatcher::start(config(), SimulatedHost::new(), MemorySink::new()).unwrap();
    let handlers = watcher.handlers();

    handlers.on_thread_created(1, "a", false);
    handlers.on_thread_created(2, "b", false);
    handlers.on_thread_terminated(&1);

    assert_eq!(watcher.tracked_threads(), 1);
    assert!(watcher.stats().written >= 3);

    let report = watcher.shutdown();
    assert_eq!(report.released_threads, 1);
}

#[test]
fn test_end_to_end_trace_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.trace");
    let host = Arc::new(SimulatedHost::new());

    let watcher = ThreadWatcher::start_with_file(config().with_output_file(&path), Arc::clone(&host)).unwrap();

    let workers: Vec<_> = (1..=3u64)
        .map(|handle| {
            let host = Arc::clone(&host);
            let handlers = watcher.handlers();
            thread::spawn(move || {
                host.set_state(handle, StateCode::RUNNABLE);
                handlers.on_thread_created(handle, &format!("worker-{}", handle), false);
                for state in [StateCode::SLEEPING, StateCode::PARKED, StateCode::RUNNABLE] {
                    thread::sleep(Duration::from_millis(15));
                    host.set_state(handle, state);
                }
                thread::sleep(Duration::from_millis(15));
                handlers.on_thread_terminated(&handle);
            })
        })
        .collect();

    for worker in workers {
        worker.join().unwrap();
    }
    let report = watcher.shutdown();

    let records: Vec<Record> = TraceReader::open(&path)
        .unwrap()
        .collect::<Result<_>>()
        .unwrap();

    assert_eq!(records.len() as u64, report.writer.appended);
    assert_eq!(report.buffer.dropped, 0);

    let mut per_thread: HashMap<u32, Vec<&Record>> = HashMap::new();
    for record in &records {
        per_thread.entry(record.thread_id).or_default().push(record);
    }
    assert_eq!(per_thread.len(), 3);

    for (id, history) in per_thread {
        assert_eq!(history.first().map(|r| r.kind()), Some(RecordKind::ThreadStart), "thread {}", id);
        assert_eq!(history.last().map(|r| r.kind()), Some(RecordKind::ThreadEnd), "thread {}", id);
        assert!(history[1..history.len() - 1]
            .iter()
            .all(|r| r.kind() == RecordKind::ThreadStateSample));
        assert!(history.len() >= 3, "thread {} has no samples", id);
    }
}
