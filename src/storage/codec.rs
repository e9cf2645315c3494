/*!
 * Trace Codec
 * Fixed-width little-endian encoding of capture records
 *
 * Layout: a `u32` magic header, then per record `u32` kind, `u32` thread id,
 * `i64` seconds, `i64` nanoseconds and a kind-specific payload (51-byte NUL
 * padded name for starts, `u32` state for samples, nothing for ends).
 */

use crate::core::limits::{RECORD_HEADER_LEN, THREAD_NAME_FIELD_WIDTH, TRACE_MAGIC};
use crate::core::types::{StateCode, Timestamp};
use crate::core::{Result, WatchError};
use crate::monitoring::events::{Payload, Record, RecordKind, ThreadName};
use bytes::{Buf, BufMut};
use std::fs::File;
use std::io::{BufReader, ErrorKind, Read};
use std::path::Path;

/// Encoded size of a record of the given kind
#[inline]
pub const fn encoded_len(kind: RecordKind) -> usize {
    RECORD_HEADER_LEN
        + match kind {
            RecordKind::ThreadStart => THREAD_NAME_FIELD_WIDTH,
            RecordKind::ThreadEnd => 0,
            RecordKind::ThreadStateSample => 4,
        }
}

/// Write the file header
#[inline]
pub fn encode_header<B: BufMut>(buf: &mut B) {
    buf.put_u32_le(TRACE_MAGIC);
}

/// Append one record
pub fn encode_record<B: BufMut>(record: &Record, buf: &mut B) {
    buf.put_u32_le(record.kind().tag());
    buf.put_u32_le(record.thread_id);
    buf.put_i64_le(record.timestamp.secs);
    buf.put_i64_le(i64::from(record.timestamp.nanos));

    match &record.payload {
        Payload::ThreadStart { name } => {
            let bytes = name.as_bytes();
            buf.put_slice(bytes);
            buf.put_bytes(0, THREAD_NAME_FIELD_WIDTH - bytes.len());
        }
        Payload::ThreadEnd => {}
        Payload::ThreadStateSample { state } => buf.put_u32_le(state.bits()),
    }
}

/// Check the file header
pub fn decode_header<B: Buf>(buf: &mut B) -> Result<()> {
    if buf.remaining() < 4 {
        return Err(WatchError::Decode("missing trace header".into()));
    }

    let magic = buf.get_u32_le();
    if magic != TRACE_MAGIC {
        return Err(WatchError::Decode(
            format!("bad magic {:#010x}, expected {:#010x}", magic, TRACE_MAGIC).into(),
        ));
    }
    Ok(())
}

/// Decoded fixed prefix of a record
struct RecordHeader {
    kind: RecordKind,
    thread_id: u32,
    timestamp: Timestamp,
}

fn decode_record_header<B: Buf>(buf: &mut B) -> Result<RecordHeader> {
    let tag = buf.get_u32_le();
    let kind = RecordKind::from_tag(tag)
        .ok_or_else(|| WatchError::Decode(format!("unknown record kind {}", tag).into()))?;
    let thread_id = buf.get_u32_le();
    let secs = buf.get_i64_le();
    let nanos = buf.get_i64_le();

    let nanos = u32::try_from(nanos)
        .ok()
        .filter(|n| *n < 1_000_000_000)
        .ok_or_else(|| WatchError::Decode(format!("nanoseconds out of range: {}", nanos).into()))?;

    Ok(RecordHeader {
        kind,
        thread_id,
        timestamp: Timestamp::new(secs, nanos),
    })
}

fn decode_payload<B: Buf>(kind: RecordKind, buf: &mut B) -> Payload {
    match kind {
        RecordKind::ThreadStart => {
            let mut field = [0u8; THREAD_NAME_FIELD_WIDTH];
            buf.copy_to_slice(&mut field);
            Payload::ThreadStart {
                name: ThreadName::from_padded(&field),
            }
        }
        RecordKind::ThreadEnd => Payload::ThreadEnd,
        RecordKind::ThreadStateSample => Payload::ThreadStateSample {
            state: StateCode(buf.get_u32_le()),
        },
    }
}

/// Decode one record from an in-memory buffer
pub fn decode_record<B: Buf>(buf: &mut B) -> Result<Record> {
    if buf.remaining() < RECORD_HEADER_LEN {
        return Err(WatchError::Decode("truncated record header".into()));
    }

    let header = decode_record_header(buf)?;
    let payload_len = encoded_len(header.kind) - RECORD_HEADER_LEN;
    if buf.remaining() < payload_len {
        return Err(WatchError::Decode("truncated record payload".into()));
    }

    Ok(Record::new(
        header.timestamp,
        header.thread_id,
        decode_payload(header.kind, buf),
    ))
}

/// Streaming reader over a trace file
pub struct TraceReader<R: Read> {
    reader: R,
    done: bool,
}

impl TraceReader<BufReader<File>> {
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        Self::new(BufReader::new(file))
    }
}

impl<R: Read> TraceReader<R> {
    /// Wrap a reader, validating the header
    pub fn new(mut reader: R) -> Result<Self> {
        let mut header = [0u8; 4];
        if !read_full(&mut reader, &mut header)? {
            return Err(WatchError::Decode("empty trace file".into()));
        }
        decode_header(&mut &header[..])?;

        Ok(Self {
            reader,
            done: false,
        })
    }

    fn read_next(&mut self) -> Result<Option<Record>> {
        let mut frame = [0u8; RECORD_HEADER_LEN + THREAD_NAME_FIELD_WIDTH];
        if !read_full(&mut self.reader, &mut frame[..RECORD_HEADER_LEN])? {
            return Ok(None);
        }

        let tag = u32::from_le_bytes([frame[0], frame[1], frame[2], frame[3]]);
        let kind = RecordKind::from_tag(tag)
            .ok_or_else(|| WatchError::Decode(format!("unknown record kind {}", tag).into()))?;
        let len = encoded_len(kind);
        if len > RECORD_HEADER_LEN && !read_full(&mut self.reader, &mut frame[RECORD_HEADER_LEN..len])? {
            return Err(WatchError::Decode("truncated record payload".into()));
        }

        decode_record(&mut &frame[..len]).map(Some)
    }
}

impl<R: Read> Iterator for TraceReader<R> {
    type Item = Result<Record>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        match self.read_next() {
            Ok(Some(record)) => Some(Ok(record)),
            Ok(None) => {
                self.done = true;
                None
            }
            Err(e) => {
                self.done = true;
                Some(Err(e))
            }
        }
    }
}

/// Fill `buf` completely; `Ok(false)` on a clean end of input before the first byte
fn read_full<R: Read>(reader: &mut R, buf: &mut [u8]) -> Result<bool> {
    let mut filled = 0;
    while filled < buf.len() {
        match reader.read(&mut buf[filled..]) {
            Ok(0) if filled == 0 => return Ok(false),
            Ok(0) => return Err(WatchError::Decode("unexpected end of trace".into())),
            Ok(n) => filled += n,
            Err(e) if e.kind() == ErrorKind::Interrupted => continue,
            Err(e) => return Err(e.into()),
        }
    }
    Ok(true)
}
