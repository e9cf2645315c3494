/*!
 * Ring Buffer Tests
 */

use proptest::prelude::*;
use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread;
use threadwatch::monitoring::{ConsumeOutcome, ProduceOutcome};
use threadwatch::{Payload, Record, RingBuffer, StateCode, Timestamp};

fn marker(id: u32) -> Record {
    Record::new(Timestamp::new(0, 0), id, Payload::ThreadEnd)
}

#[test]
fn test_capacity_four_scenario() {
    let ring = RingBuffer::with_capacity(4).unwrap();

    for id in 1..=3 {
        let outcome = ring.try_produce(|| Some(Record::thread_start(id, "t").unwrap()));
        assert_eq!(outcome, ProduceOutcome::Committed);
    }
    let stats = ring.stats();
    assert_eq!((stats.written, stats.dropped), (3, 0));

    assert_eq!(
        ring.try_produce(|| Some(Record::thread_start(4, "t").unwrap())),
        ProduceOutcome::Dropped
    );
    assert_eq!(ring.stats().dropped, 1);
    assert_eq!(ring.stats().written, 3);

    let mut consumed = None;
    assert_eq!(
        ring.try_consume(|record| consumed = Some(*record)),
        ConsumeOutcome::Consumed
    );
    let consumed = consumed.unwrap();
    assert_eq!(consumed.thread_id, 1);
    assert!(consumed.name().is_some());

    assert!(ring
        .try_produce(|| Some(Record::thread_start(4, "t").unwrap()))
        .is_committed());
}

#[test]
fn test_concurrent_producers_keep_per_producer_order() {
    const PRODUCERS: u32 = 4;
    const PER_PRODUCER: u32 = 2_000;

    let ring = Arc::new(RingBuffer::with_capacity(64).unwrap());
    let running = Arc::new(AtomicUsize::new(PRODUCERS as usize));

    let producers: Vec<_> = (0..PRODUCERS)
        .map(|producer| {
            let ring = Arc::clone(&ring);
            let running = Arc::clone(&running);
            thread::spawn(move || {
                for seq in 0..PER_PRODUCER {
                    ring.try_produce(|| {
                        Some(Record::new(
                            Timestamp::new(0, 0),
                            producer,
                            Payload::ThreadStateSample {
                                state: StateCode(seq),
                            },
                        ))
                    });
                }
                running.fetch_sub(1, Ordering::Release);
            })
        })
        .collect();

    let mut last_seen = vec![None::<u32>; PRODUCERS as usize];
    let mut consumed = 0u64;
    loop {
        let finished = running.load(Ordering::Acquire) == 0;
        match ring.pop() {
            Some(record) => {
                let seq = record.state().unwrap().bits();
                let slot = &mut last_seen[record.thread_id as usize];
                assert!(slot.map_or(true, |last| seq > last));
                *slot = Some(seq);
                consumed += 1;
            }
            None if finished => break,
            None => thread::yield_now(),
        }
    }

    for producer in producers {
        producer.join().unwrap();
    }

    let stats = ring.stats();
    assert_eq!(stats.read, consumed);
    assert_eq!(stats.written, consumed);
    assert_eq!(stats.written + stats.dropped, u64::from(PRODUCERS * PER_PRODUCER));
}

proptest! {
    #[test]
    fn prop_interleaved_produce_consume(
        capacity in 2usize..16,
        ops in proptest::collection::vec(any::<bool>(), 0..200),
    ) {
        let ring = RingBuffer::with_capacity(capacity).unwrap();
        let mut model = VecDeque::new();
        let mut next_id = 0u32;
        let mut dropped = 0u64;

        for produce in ops {
            if produce {
                let id = next_id;
                let outcome = ring.try_produce(|| Some(marker(id)));
                if model.len() == capacity - 1 {
                    prop_assert_eq!(outcome, ProduceOutcome::Dropped);
                    dropped += 1;
                } else {
                    prop_assert_eq!(outcome, ProduceOutcome::Committed);
                    model.push_back(id);
                    next_id += 1;
                }
            } else {
                let popped = ring.pop().map(|r| r.thread_id);
                prop_assert_eq!(popped, model.pop_front());
            }

            let stats = ring.stats();
            prop_assert!(stats.read <= stats.written);
            prop_assert!(stats.pending < capacity);
            prop_assert_eq!(stats.pending, model.len());
            prop_assert_eq!(stats.dropped, dropped);
        }
    }

    #[test]
    fn prop_skipped_builds_change_nothing(capacity in 2usize..16, filled in 0usize..16) {
        let ring = RingBuffer::with_capacity(capacity).unwrap();
        for id in 0..filled.min(capacity - 1) {
            ring.try_produce(|| Some(marker(id as u32)));
        }

        let before = ring.stats();
        let outcome = ring.try_produce(|| None);

        if before.pending == capacity - 1 {
            prop_assert_eq!(outcome, ProduceOutcome::Dropped);
            prop_assert_eq!(ring.stats().dropped, before.dropped + 1);
        } else {
            prop_assert_eq!(outcome, ProduceOutcome::Skipped);
            prop_assert_eq!(ring.stats(), before);
        }
    }
}
