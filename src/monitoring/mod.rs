/*!
 * Thread Monitoring
 * Capture pipeline: lifecycle producers and sampler feed a bounded buffer
 * that a writer thread drains to a sink
 */

pub mod analysis;
pub mod collection;
pub mod events;
pub mod streaming;
mod tracer;

pub use analysis::{DelayController, PassReport, SamplerHandle, SamplingLoop};
pub use collection::{
    LifecycleHandlers, ShutdownReport, ThreadNode, ThreadRegistry, ThreadTable, ThreadWatcher,
    WatchContext,
};
pub use events::{Payload, Record, RecordKind, ThreadName};
pub use streaming::{
    BufferStats, ConsumeOutcome, DrainWriter, ProduceOutcome, RingBuffer, WriterHandle, WriterStats,
};
pub use tracer::{init_tracing, session_span, ENV_TRACE_JSON};
