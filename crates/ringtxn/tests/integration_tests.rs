//! Threaded producer/consumer tests.
//!
//! One producer thread and one consumer thread hammer a shared buffer with
//! randomly sized records and retry-on-failure loops; the consumer must
//! observe an exact prefix of the producer's stream.

use crossbeam_utils::Backoff;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringtxn::RingBuffer;
use std::sync::Arc;
use std::thread;

/// Ships `records` records with pseudorandom payload sizes through a
/// buffer of `capacity` bytes and verifies order and content on the
/// consumer side.
fn run_stream(capacity: u32, max_payload: usize, records: u64, seed: u64) {
    let buf = Arc::new({
        let mut b = RingBuffer::<u64>::new();
        b.reserve(capacity).unwrap();
        b
    });

    let producer = Arc::clone(&buf);
    let bg = thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(seed);
        let backoff = Backoff::new();
        for i in 0..records {
            let len = rng.gen_range(0..=max_payload);
            let payload: Vec<u8> = (0..len).map(|j| (i as usize ^ j) as u8).collect();
            loop {
                if let Some(mut tx) = producer.try_write(i) {
                    if tx.push_bytes(&payload) {
                        backoff.reset();
                        break; // commits on scope exit
                    }
                    tx.invalidate();
                }
                backoff.snooze();
            }
        }
    });

    let backoff = Backoff::new();
    for i in 0..records {
        loop {
            if let Some(mut rx) = buf.try_read() {
                assert_eq!(rx.timestamp(), i, "record order broken");
                let len = rx.size();
                let mut got = Vec::with_capacity(len as usize);
                assert!(rx.pop_bytes(len, |chunk| got.extend_from_slice(chunk)));
                for (j, byte) in got.iter().enumerate() {
                    assert_eq!(*byte, (i as usize ^ j) as u8, "payload corrupted");
                }
                backoff.reset();
                break;
            }
            backoff.snooze();
        }
    }

    bg.join().unwrap();
    assert_eq!(buf.size(), 0);
}

#[test]
fn test_threaded_prefix_order() {
    run_stream(4096, 64, 20_000, 7);
}

/// A 64-byte arena forces constant wrap-around and full-buffer rejection
/// under concurrency.
#[test]
fn test_threaded_wrap_pressure() {
    run_stream(64, 16, 50_000, 11);
}

/// The CRC32 of the reconstructed stream equals the CRC32 of the original
/// bytes: the consumer sees exactly what the producer shipped, across
/// record framing and wrap splits.
#[test]
fn test_crc_stream_equivalence() {
    const TOTAL: usize = 16 << 20; // 16 MiB
    const CAPACITY: u32 = 256 * 1024;
    const MAX_CHUNK: usize = 4096;

    let buf = Arc::new({
        let mut b = RingBuffer::<u64>::new();
        b.reserve(CAPACITY).unwrap();
        b
    });

    let producer = Arc::clone(&buf);
    let bg = thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(42);
        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = vec![0u8; MAX_CHUNK];
        let backoff = Backoff::new();

        let mut remaining = TOTAL;
        let mut seq = 0u64;
        while remaining > 0 {
            let len = rng.gen_range(1..=MAX_CHUNK).min(remaining);
            rng.fill(&mut chunk[..len]);
            hasher.update(&chunk[..len]);
            loop {
                if let Some(mut tx) = producer.try_write(seq) {
                    if tx.push_back(len as u32) && tx.push_bytes(&chunk[..len]) {
                        backoff.reset();
                        break;
                    }
                    tx.invalidate();
                }
                backoff.snooze();
            }
            seq += 1;
            remaining -= len;
        }
        hasher.finalize()
    });

    let mut hasher = crc32fast::Hasher::new();
    let backoff = Backoff::new();
    let mut received = 0usize;
    let mut expected_seq = 0u64;
    while received < TOTAL {
        if let Some(mut rx) = buf.try_read() {
            assert_eq!(rx.timestamp(), expected_seq);
            let len = rx.pop_front::<u32>().expect("chunk length prefix");
            assert_eq!(rx.remaining(), len);
            assert!(rx.pop_bytes(len, |chunk| hasher.update(chunk)));
            received += len as usize;
            expected_seq += 1;
            backoff.reset();
        } else {
            backoff.snooze();
        }
    }

    let produced = bg.join().unwrap();
    assert_eq!(hasher.finalize(), produced);
}
