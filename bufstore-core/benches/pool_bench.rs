#[macro_use]
extern crate criterion;

use criterion::{BatchSize, Criterion};

use bufstore_core::BufferStore;

fn bench_acquire_release(c: &mut Criterion) {
    let mut group = c.benchmark_group("pool_acquire_release");

    for count in [64, 1024, 16384] {
        group.throughput(criterion::Throughput::Elements(1));
        group.bench_function(format!("buffers_{}", count), |b| {
            let mut store = BufferStore::new(count, 2048).unwrap();
            b.iter(|| {
                let buf = store.acquire().unwrap();
                store.release(criterion::black_box(buf));
            });
        });
    }
    group.finish();
}

fn bench_drain_refill(c: &mut Criterion) {
    c.bench_function("pool_drain_refill_1024", |b| {
        b.iter_batched_ref(
            || BufferStore::new(1024, 2048).unwrap(),
            |store| {
                let mut held = Vec::with_capacity(1024);
                while let Ok(buf) = store.acquire() {
                    held.push(buf);
                }
                for buf in held.into_iter().rev() {
                    store.release(buf);
                }
            },
            BatchSize::LargeInput,
        );
    });
}

fn bench_locked_release(c: &mut Criterion) {
    c.bench_function("pool_lock_unlock_release", |b| {
        let mut store = BufferStore::new(256, 2048).unwrap();
        b.iter(|| {
            let buf = store.acquire().unwrap();
            store.lock_control().lock_addr(buf.as_ptr());
            store.release(buf);
            store.unlock_and_release(buf);
        });
    });
}

criterion_group!(
    benches,
    bench_acquire_release,
    bench_drain_refill,
    bench_locked_release
);
criterion_main!(benches);
