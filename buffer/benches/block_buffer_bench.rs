use std::thread;

use boundbuf::BlockBuffer;
use criterion::{BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main};

const ITEMS: u64 = 10_000;

fn bench_uncontended(c: &mut Criterion) {
    let buf = BlockBuffer::<u64>::new(1024).unwrap();

    c.bench_function("put_take_uncontended", |b| {
        b.iter(|| {
            buf.put(black_box(1)).unwrap();
            black_box(buf.take().unwrap());
        })
    });

    c.bench_function("try_put_try_take_uncontended", |b| {
        b.iter(|| {
            buf.try_put(black_box(1)).unwrap();
            black_box(buf.try_take().unwrap());
        })
    });
}

fn run_spsc(capacity: usize) -> u64 {
    let buf = BlockBuffer::<u64>::new(capacity).unwrap();
    let producer_buf = buf.clone();

    let producer = thread::spawn(move || {
        for i in 0..ITEMS {
            producer_buf.put(i).unwrap();
        }
        producer_buf.close();
    });

    let sum = buf.iter().sum();
    producer.join().unwrap();
    sum
}

fn run_mpmc(capacity: usize, producers: u64, consumers: usize) -> u64 {
    let buf = BlockBuffer::<u64>::new(capacity).unwrap();

    let consumer_handles: Vec<_> = (0..consumers)
        .map(|_| {
            let buf = buf.clone();
            thread::spawn(move || buf.iter().sum::<u64>())
        })
        .collect();

    let producer_handles: Vec<_> = (0..producers)
        .map(|_| {
            let buf = buf.clone();
            thread::spawn(move || {
                for i in 0..ITEMS / producers {
                    buf.put(i).unwrap();
                }
            })
        })
        .collect();

    for p in producer_handles {
        p.join().unwrap();
    }
    buf.close();
    consumer_handles.into_iter().map(|c| c.join().unwrap()).sum()
}

fn bench_handoff(c: &mut Criterion) {
    let mut group = c.benchmark_group("handoff");
    group.throughput(Throughput::Elements(ITEMS));
    group.sample_size(20);

    for capacity in [1usize, 16, 256] {
        group.bench_with_input(BenchmarkId::new("spsc", capacity), &capacity, |b, &cap| {
            b.iter(|| black_box(run_spsc(cap)))
        });
        group.bench_with_input(BenchmarkId::new("mpmc_4x4", capacity), &capacity, |b, &cap| {
            b.iter(|| black_box(run_mpmc(cap, 4, 4)))
        });
    }

    group.finish();
}

criterion_group!(benches, bench_uncontended, bench_handoff);
criterion_main!(benches);
