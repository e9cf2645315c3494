/*!
 * Drain Writer
 * Background thread moving records from the ring buffer to a sink
 */

use super::RingBuffer;
use crate::core::limits::{WRITER_IDLE_DELAY, WRITER_THREAD_NAME};
use crate::core::{Result, WatchError};
use crate::monitoring::tracer::session_span;
use crate::storage::RecordSink;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Delivery counters reported when the writer exits
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct WriterStats {
    pub appended: u64,
    pub failed: u64,
}

/// Drain loop state
pub struct DrainWriter<S: RecordSink> {
    buffer: Arc<RingBuffer>,
    sink: S,
    stop: Arc<AtomicBool>,
    idle_delay: Duration,
    stats: WriterStats,
}

impl<S: RecordSink> DrainWriter<S> {
    pub fn new(buffer: Arc<RingBuffer>, sink: S, stop: Arc<AtomicBool>) -> Self {
        Self {
            buffer,
            sink,
            stop,
            idle_delay: WRITER_IDLE_DELAY,
            stats: WriterStats::default(),
        }
    }

    pub fn with_idle_delay(mut self, idle_delay: Duration) -> Self {
        self.idle_delay = idle_delay;
        self
    }

    /// Forward one record if any is pending
    ///
    /// The sink runs outside the buffer lock so a slow disk never stalls producers.
    pub fn drain_one(&mut self) -> bool {
        let Some(record) = self.buffer.pop() else {
            return false;
        };

        match self.sink.append(&record) {
            Ok(()) => self.stats.appended += 1,
            Err(e) => {
                self.stats.failed += 1;
                warn!(error = %e, thread_id = record.thread_id, "Failed to append record");
            }
        }
        true
    }

    /// Drain until stopped and empty, then close the sink
    pub fn run(mut self) -> WriterStats {
        loop {
            // Read the flag before polling so a stop raised after an empty poll
            // still gets one more pass
            let stopping = self.stop.load(Ordering::Acquire);

            if self.drain_one() {
                continue;
            }

            if stopping {
                break;
            }

            thread::sleep(self.idle_delay);
        }

        if let Err(e) = self.sink.close() {
            error!(error = %e, "Failed to close record sink");
        }

        debug!(
            appended = self.stats.appended,
            failed = self.stats.failed,
            "Writer drained"
        );
        self.stats
    }
}

/// Handle to the running writer thread
pub struct WriterHandle {
    stop: Arc<AtomicBool>,
    handle: Option<JoinHandle<WriterStats>>,
}

impl WriterHandle {
    /// Start the drain thread
    pub fn spawn<S>(buffer: Arc<RingBuffer>, sink: S, session: Uuid) -> Result<Self>
    where
        S: RecordSink + 'static,
    {
        let stop = Arc::new(AtomicBool::new(false));
        let writer = DrainWriter::new(buffer, sink, Arc::clone(&stop));

        let handle = thread::Builder::new()
            .name(WRITER_THREAD_NAME.to_string())
            .spawn(move || {
                let span = session_span("writer", session);
                let _entered = span.enter();
                writer.run()
            })
            .map_err(|e| WatchError::Spawn {
                thread: WRITER_THREAD_NAME,
                reason: e.to_string().into(),
            })?;

        info!(session = %session, "Writer thread started");

        Ok(Self {
            stop,
            handle: Some(handle),
        })
    }

    /// Signal the writer, wait for it to drain the buffer, and join it
    pub fn stop_and_join(mut self) -> WriterStats {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> WriterStats {
        self.stop.store(true, Ordering::Release);

        match self.handle.take().map(JoinHandle::join) {
            Some(Ok(stats)) => stats,
            Some(Err(_)) => {
                error!("Writer thread panicked");
                WriterStats::default()
            }
            None => WriterStats::default(),
        }
    }
}

impl Drop for WriterHandle {
    fn drop(&mut self) {
        if self.handle.is_some() {
            warn!("Writer handle dropped without stop_and_join; draining now");
            self.stop_inner();
        }
    }
}
