/*!
 * File Sink
 * Append-only binary trace file
 */

use super::codec::{encode_header, encode_record};
use super::RecordSink;
use crate::core::limits::{RECORD_HEADER_LEN, THREAD_NAME_FIELD_WIDTH, TRACE_WRITE_BUFFER};
use crate::core::{Result, WatchError};
use crate::monitoring::events::Record;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Trace file writer
///
/// The header is written on open; records are buffered and flushed on close.
pub struct FileSink {
    path: PathBuf,
    writer: Option<BufWriter<File>>,
    scratch: Vec<u8>,
    records: u64,
}

impl FileSink {
    /// Create (truncating) the destination and write the header
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref().to_path_buf();
        let file = File::create(&path)?;
        let mut writer = BufWriter::with_capacity(TRACE_WRITE_BUFFER, file);

        let mut header = Vec::with_capacity(4);
        encode_header(&mut header);
        writer.write_all(&header)?;

        info!(path = %path.display(), "Opened trace file");

        Ok(Self {
            path,
            writer: Some(writer),
            scratch: Vec::with_capacity(RECORD_HEADER_LEN + THREAD_NAME_FIELD_WIDTH),
            records: 0,
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Records appended so far
    pub fn records(&self) -> u64 {
        self.records
    }
}

impl RecordSink for FileSink {
    fn append(&mut self, record: &Record) -> Result<()> {
        let Some(writer) = self.writer.as_mut() else {
            return Err(WatchError::Persistence("trace file already closed".into()));
        };

        self.scratch.clear();
        encode_record(record, &mut self.scratch);
        writer.write_all(&self.scratch)?;
        self.records += 1;
        Ok(())
    }

    fn close(&mut self) -> Result<()> {
        if let Some(mut writer) = self.writer.take() {
            writer.flush()?;
            writer.get_ref().sync_data()?;
            debug!(path = %self.path.display(), records = self.records, "Closed trace file");
        }
        Ok(())
    }
}

impl Drop for FileSink {
    fn drop(&mut self) {
        // BufWriter flushes on drop, but errors there are swallowed
        let _ = self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TraceReader;
    use tempfile::TempDir;

    #[test]
    fn test_write_and_read_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out.trace");

        let mut sink = FileSink::open(&path).unwrap();
        sink.append(&Record::thread_start(1, "main").unwrap()).unwrap();
        sink.append(&Record::thread_end(1).unwrap()).unwrap();
        sink.close().unwrap();
        assert_eq!(sink.records(), 2);

        let records: Vec<Record> = TraceReader::open(&path)
            .unwrap()
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].name().map(|n| n.as_str()), Some("main"));
    }

    #[test]
    fn test_append_after_close_fails() {
        let dir = TempDir::new().unwrap();
        let mut sink = FileSink::open(dir.path().join("closed.trace")).unwrap();
        sink.close().unwrap();

        assert!(sink.append(&Record::thread_end(1).unwrap()).is_err());
        assert!(sink.close().is_ok());
    }

    #[test]
    fn test_open_missing_directory_fails() {
        let dir = TempDir::new().unwrap();
        assert!(FileSink::open(dir.path().join("missing").join("x.trace")).is_err());
    }
}
