/*!
 * Storage
 * Destinations for drained records and the on-disk trace format
 */

pub mod codec;
mod file;

pub use codec::TraceReader;
pub use file::FileSink;

use crate::core::{Result, WatchError};
use crate::monitoring::events::Record;
use parking_lot::Mutex;
use std::sync::Arc;

/// Destination for drained records
///
/// `append` failures are logged by the writer and never stop the pipeline.
pub trait RecordSink: Send {
    fn append(&mut self, record: &Record) -> Result<()>;

    fn close(&mut self) -> Result<()>;
}

impl<S: RecordSink + ?Sized> RecordSink for Box<S> {
    fn append(&mut self, record: &Record) -> Result<()> {
        (**self).append(record)
    }

    fn close(&mut self) -> Result<()> {
        (**self).close()
    }
}

#[derive(Default)]
struct MemoryState {
    records: Vec<Record>,
    closed: bool,
    fail_appends: bool,
}

/// Shared in-memory sink
///
/// Clones see the same records, so a test can keep one clone while the
/// writer thread owns another.
#[derive(Clone, Default)]
pub struct MemorySink {
    state: Arc<Mutex<MemoryState>>,
}

impl MemorySink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything appended so far
    pub fn records(&self) -> Vec<Record> {
        self.state.lock().records.clone()
    }

    pub fn is_closed(&self) -> bool {
        self.state.lock().closed
    }

    /// Make subsequent appends fail
    pub fn fail_appends(&self, fail: bool) {
        self.state.lock().fail_appends = fail;
    }
}

impl RecordSink for MemorySink {
    fn append(&mut self, record: &Record) -> Result<()> {
        let mut state = self.state.lock();
        if state.fail_appends {
            return Err(WatchError::Persistence("memory sink rejecting appends".into()));
        }
        state.records.push(*record);
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        self.state.lock().closed = true;
        Ok(())
    }
}
