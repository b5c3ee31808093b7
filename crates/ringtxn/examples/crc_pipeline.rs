//! Producer/consumer CRC pipeline.
//!
//! A producer thread ships pseudorandom bytes through the buffer in
//! random-sized length-prefixed chunks; the consumer reconstructs the
//! stream with the zero-copy split-aware pop and CRC32s it. Matching
//! checksums prove byte-exact delivery across framing and wrap splits.
//!
//! Usage: `cargo run --release --example crc_pipeline [total MiB]`

use crossbeam_utils::Backoff;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use ringtxn::RingBuffer;
use std::sync::Arc;
use std::thread;
use std::time::Instant;

const BUFFER_BYTES: u32 = 2 << 20; // 2 MiB ring
const MAX_CHUNK: usize = 4096;

fn main() {
    let total_mib: usize = std::env::args()
        .nth(1)
        .and_then(|arg| arg.parse().ok())
        .unwrap_or(420);
    let total = total_mib << 20;

    println!("ringtxn CRC Pipeline");
    println!("====================\n");
    println!("Configuration:");
    println!("  Ring capacity: {} MiB", BUFFER_BYTES >> 20);
    println!("  Stream size:   {} MiB", total_mib);
    println!("  Chunk size:    1..={} bytes\n", MAX_CHUNK);

    let buf = Arc::new({
        let mut b = RingBuffer::<u64>::new();
        b.reserve(BUFFER_BYTES).unwrap();
        b.set_metrics_enabled(true);
        b
    });

    let start = Instant::now();

    let producer = Arc::clone(&buf);
    let producer_handle = thread::spawn(move || {
        let mut rng = StdRng::seed_from_u64(0xC0FFEE);
        let mut hasher = crc32fast::Hasher::new();
        let mut chunk = vec![0u8; MAX_CHUNK];
        let backoff = Backoff::new();

        let mut remaining = total;
        let mut seq = 0u64;
        while remaining > 0 {
            let len = rng.gen_range(1..=MAX_CHUNK).min(remaining);
            rng.fill(&mut chunk[..len]);
            hasher.update(&chunk[..len]);

            loop {
                if let Some(mut tx) = producer.try_write(seq) {
                    if tx.push_back(len as u32) && tx.push_bytes(&chunk[..len]) {
                        backoff.reset();
                        break; // commits on scope exit
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

    // Consumer runs on the main thread.
    let mut hasher = crc32fast::Hasher::new();
    let backoff = Backoff::new();
    let mut received = 0usize;
    while received < total {
        if let Some(mut rx) = buf.try_read() {
            let len = rx.pop_front::<u32>().expect("chunk length prefix");
            rx.pop_bytes(len, |chunk| hasher.update(chunk));
            received += len as usize;
            backoff.reset();
        } else {
            backoff.snooze();
        }
    }

    let produced_crc = producer_handle.join().unwrap();
    let consumed_crc = hasher.finalize();
    let duration = start.elapsed();
    let metrics = buf.metrics();

    let mib_per_sec = (total as f64 / duration.as_secs_f64()) / (1 << 20) as f64;
    println!("Results:");
    println!("  Records:       {}", metrics.records_consumed);
    println!("  Duration:      {:.2?}", duration);
    println!("  Throughput:    {:.1} MiB/sec", mib_per_sec);
    println!("  Producer CRC:  {:#010x}", produced_crc);
    println!("  Consumer CRC:  {:#010x}", consumed_crc);

    assert_eq!(produced_crc, consumed_crc, "stream corrupted in transit");
    println!("\nChecksums match.");
}
