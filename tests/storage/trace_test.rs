/*!
 * Trace File Tests
 */

use pretty_assertions::assert_eq;
use std::fs;
use tempfile::TempDir;
use threadwatch::limits::{MAX_THREAD_NAME_LENGTH, TRACE_MAGIC};
use threadwatch::{FileSink, Payload, Record, RecordSink, Result, StateCode, ThreadName, Timestamp, TraceReader, WatchError};

fn session() -> Vec<Record> {
    vec![
        Record::new(
            Timestamp::new(1_700_000_000, 5),
            1,
            Payload::ThreadStart {
                name: ThreadName::new("main"),
            },
        ),
        Record::new(
            Timestamp::new(1_700_000_000, 900_000_000),
            1,
            Payload::ThreadStateSample {
                state: StateCode::ALIVE.union(StateCode::WAITING).union(StateCode::PARKED),
            },
        ),
        Record::new(
            Timestamp::new(1_700_000_001, 0),
            2,
            Payload::ThreadStart {
                name: ThreadName::new(&"long-name-".repeat(10)),
            },
        ),
        Record::new(Timestamp::new(1_700_000_002, 42), 1, Payload::ThreadEnd),
    ]
}

fn write_trace(path: &std::path::Path, records: &[Record]) {
    let mut sink = FileSink::open(path).unwrap();
    for record in records {
        sink.append(record).unwrap();
    }
    sink.close().unwrap();
}

#[test]
fn test_file_layout() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("layout.trace");
    write_trace(&path, &session());

    let bytes = fs::read(&path).unwrap();
    // header + start(24 + 51) + sample(24 + 4) + start(24 + 51) + end(24)
    assert_eq!(bytes.len(), 4 + 75 + 28 + 75 + 24);
    assert_eq!(&bytes[..4], &TRACE_MAGIC.to_le_bytes());
    assert_eq!(&bytes[4..8], &0u32.to_le_bytes());
    assert_eq!(&bytes[8..12], &1u32.to_le_bytes());
    assert_eq!(&bytes[12..20], &1_700_000_000i64.to_le_bytes());
    assert_eq!(&bytes[20..28], &5i64.to_le_bytes());
    assert_eq!(&bytes[28..32], b"main");
    assert!(bytes[32..79].iter().all(|&b| b == 0));
}

#[test]
fn test_read_back_preserves_records() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("session.trace");
    write_trace(&path, &session());

    let records: Vec<Record> = TraceReader::open(&path).unwrap().collect::<Result<_>>().unwrap();

    let mut expected = session();
    expected[2] = Record::new(
        expected[2].timestamp,
        2,
        Payload::ThreadStart {
            name: ThreadName::new(&"long-name-".repeat(10)[..MAX_THREAD_NAME_LENGTH]),
        },
    );
    assert_eq!(records, expected);
    assert_eq!(
        records[1].state().unwrap().flag_names(),
        vec!["ALIVE", "WAITING", "PARKED"]
    );
}

#[test]
fn test_truncated_trace_reports_error_once() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("truncated.trace");
    write_trace(&path, &session());

    let bytes = fs::read(&path).unwrap();
    fs::write(&path, &bytes[..bytes.len() - 10]).unwrap();

    let results: Vec<Result<Record>> = TraceReader::open(&path).unwrap().collect();
    assert_eq!(results.len(), 4);
    assert!(results[..3].iter().all(|r| r.is_ok()));
    assert!(matches!(results[3], Err(WatchError::Decode(_))));
}

#[test]
fn test_rejects_foreign_file() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("foreign.trace");
    fs::write(&path, b"PK\x03\x04 not a trace").unwrap();

    assert!(matches!(TraceReader::open(&path), Err(WatchError::Decode(_))));
    assert!(TraceReader::open(dir.path().join("missing.trace")).is_err());
}

#[test]
fn test_empty_session_is_header_only() {
    let dir = TempDir::new().unwrap();
    let path = dir.path().join("empty.trace");
    write_trace(&path, &[]);

    assert_eq!(fs::read(&path).unwrap(), TRACE_MAGIC.to_le_bytes().to_vec());
    assert_eq!(TraceReader::open(&path).unwrap().count(), 0);
}
