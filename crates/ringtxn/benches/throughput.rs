use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use ringtxn::RingBuffer;
use std::sync::Arc;
use std::thread;

const RECORDS: u64 = 1_000_000;
const PAYLOAD: usize = 64;

fn record_len() -> u64 {
    u64::from(RingBuffer::<u64>::HEADER_BYTES) + PAYLOAD as u64
}

fn bench_spsc(c: &mut Criterion) {
    let mut group = c.benchmark_group("spsc");
    group.throughput(Throughput::Bytes(RECORDS * record_len()));

    group.bench_function("producer_consumer_64b", |b| {
        b.iter(|| {
            let buf = Arc::new({
                let mut b = RingBuffer::<u64>::new();
                b.reserve(1 << 20).unwrap();
                b
            });

            let producer = Arc::clone(&buf);
            let handle = thread::spawn(move || {
                let payload = [0xA5u8; PAYLOAD];
                let mut sent = 0u64;
                while sent < RECORDS {
                    if let Some(mut tx) = producer.try_write(sent) {
                        if tx.push_bytes(&payload) {
                            sent += 1;
                            continue; // commits on scope exit
                        }
                        tx.invalidate();
                    }
                    std::hint::spin_loop();
                }
            });

            let mut received = 0u64;
            while received < RECORDS {
                if let Some(mut rx) = buf.try_read() {
                    rx.pop_bytes(PAYLOAD as u32, |chunk| {
                        black_box(chunk);
                    });
                    received += 1;
                } else {
                    std::hint::spin_loop();
                }
            }

            handle.join().unwrap();
        });
    });

    group.finish();
}

fn bench_single_thread(c: &mut Criterion) {
    let mut group = c.benchmark_group("single_thread");
    group.throughput(Throughput::Bytes(record_len()));

    // Pure framing cost: one write transaction plus one read transaction,
    // no cross-core traffic.
    group.bench_function("record_cycle_64b", |b| {
        let mut buf = RingBuffer::<u64>::new();
        buf.reserve(4096).unwrap();
        let payload = [0x5Au8; PAYLOAD];

        b.iter(|| {
            let mut tx = buf.try_write(black_box(1)).unwrap();
            tx.push_bytes(&payload);
            drop(tx);

            let mut rx = buf.try_read().unwrap();
            rx.pop_bytes(PAYLOAD as u32, |chunk| {
                black_box(chunk);
            });
        });
    });

    group.finish();
}

criterion_group!(benches, bench_spsc, bench_single_thread);
criterion_main!(benches);
