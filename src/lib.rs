/*!
 * ThreadWatch Library
 * In-process thread lifecycle and state capture exposed as a library
 */

pub mod cli;
pub mod core;
pub mod host;
pub mod monitoring;
pub mod storage;

// Re-exports
pub use crate::core::limits;
pub use crate::core::{Result, StateCode, ThreadId, Timestamp, WatchConfig, WatchError};
pub use host::{SimulatedHost, ThreadHost};
pub use monitoring::{
    init_tracing, BufferStats, LifecycleHandlers, Payload, Record, RecordKind, RingBuffer, ShutdownReport,
    ThreadName, ThreadRegistry, ThreadTable, ThreadWatcher, WriterStats,
};
pub use storage::{FileSink, MemorySink, RecordSink, TraceReader};
