/*!
 * Thread Watcher
 * Owns a capture session: buffer, registry, sampler and writer threads
 *
 * Startup: validate config, allocate the buffer, start the writer, then the sampler.
 * Shutdown: raise the flag inside the critical section, join the sampler, let the
 * writer drain to empty and join it, release leftover threads, tear the buffer down.
 */

use super::context::WatchContext;
use super::handlers::LifecycleHandlers;
use super::registry::{ThreadRegistry, ThreadTable};
use crate::core::{Result, WatchConfig};
use crate::host::ThreadHost;
use crate::monitoring::analysis::SamplerHandle;
use crate::monitoring::streaming::{BufferStats, RingBuffer, WriterHandle, WriterStats};
use crate::storage::{FileSink, RecordSink};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Final counters of a capture session
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShutdownReport {
    pub buffer: BufferStats,
    pub writer: WriterStats,
    pub sampling_passes: u64,
    /// Threads still tracked at shutdown, released without an end record
    pub released_threads: usize,
}

/// Running capture session
///
/// Call [`ThreadWatcher::shutdown`] to stop it; dropping the watcher runs the
/// same sequence and logs a warning.
pub struct ThreadWatcher<H, R = ThreadTable<<H as ThreadHost>::Handle>>
where
    H: ThreadHost,
    R: ThreadRegistry<H::Handle>,
{
    context: Arc<WatchContext<H, R>>,
    sampler: Option<SamplerHandle<H, R>>,
    writer: Option<WriterHandle>,
    finished: bool,
}

impl<H: ThreadHost> ThreadWatcher<H> {
    /// Start capturing into `sink` with the default registry
    pub fn start<S>(config: WatchConfig, host: H, sink: S) -> Result<Self>
    where
        S: RecordSink + 'static,
    {
        Self::start_with_registry(config, host, ThreadTable::new(), sink)
    }

    /// Start capturing into the trace file named by the config
    pub fn start_with_file(config: WatchConfig, host: H) -> Result<Self> {
        config.validate()?;
        let sink = FileSink::open(&config.output_file)?;
        Self::start(config, host, sink)
    }
}

impl<H, R> ThreadWatcher<H, R>
where
    H: ThreadHost,
    R: ThreadRegistry<H::Handle>,
{
    /// Start capturing with a caller-provided registry
    pub fn start_with_registry<S>(config: WatchConfig, host: H, registry: R, sink: S) -> Result<Self>
    where
        S: RecordSink + 'static,
    {
        config.validate()?;

        let buffer = Arc::new(RingBuffer::with_capacity(config.buffer_capacity)?);
        let verbose = config.verbose;
        let capacity = config.buffer_capacity;
        let context = Arc::new(WatchContext::new(config, host, registry, Arc::clone(&buffer)));
        let session = context.session();

        let writer = WriterHandle::spawn(buffer, sink, session)?;
        let sampler = match SamplerHandle::spawn(Arc::clone(&context)) {
            Ok(sampler) => sampler,
            Err(e) => {
                writer.stop_and_join();
                return Err(e);
            }
        };

        if verbose {
            info!(session = %session, buffer_size = capacity, "ThreadWatch ready");
        } else {
            debug!(session = %session, buffer_size = capacity, "ThreadWatch ready");
        }

        Ok(Self {
            context,
            sampler: Some(sampler),
            writer: Some(writer),
            finished: false,
        })
    }

    /// Producers to hand to the host
    pub fn handlers(&self) -> LifecycleHandlers<H, R> {
        LifecycleHandlers::new(Arc::clone(&self.context))
    }

    /// Live buffer counters
    pub fn stats(&self) -> BufferStats {
        self.context.buffer().stats()
    }

    pub fn tracked_threads(&self) -> usize {
        self.context.tracked_threads()
    }

    #[inline]
    pub fn session(&self) -> Uuid {
        self.context.session()
    }

    #[inline]
    pub fn config(&self) -> &WatchConfig {
        self.context.config()
    }

    /// Stop capture, drain everything produced so far and report final counters
    pub fn shutdown(mut self) -> ShutdownReport {
        self.stop_inner()
    }

    fn stop_inner(&mut self) -> ShutdownReport {
        self.finished = true;
        let session = self.context.session();
        info!(session = %session, "Stopping ThreadWatch");

        self.context.begin_shutdown();

        let sampling_passes = self
            .sampler
            .take()
            .map(SamplerHandle::stop_and_join)
            .unwrap_or_default();

        let writer = self
            .writer
            .take()
            .map(WriterHandle::stop_and_join)
            .unwrap_or_default();

        let released_threads = self.context.release_all();
        let buffer = self.context.buffer().teardown();

        info!(
            session = %session,
            appended = writer.appended,
            failed = writer.failed,
            sampling_passes,
            released_threads,
            "ThreadWatch stopped"
        );

        ShutdownReport {
            buffer,
            writer,
            sampling_passes,
            released_threads,
        }
    }
}

impl<H, R> Drop for ThreadWatcher<H, R>
where
    H: ThreadHost,
    R: ThreadRegistry<H::Handle>,
{
    fn drop(&mut self) {
        if !self.finished {
            warn!("ThreadWatcher dropped without calling shutdown(); stopping now");
            self.stop_inner();
        }
    }
}
