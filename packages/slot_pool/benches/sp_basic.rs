//! Basic operations on `ObjectPool` and `PoolRef`, compared against plain heap allocation.
#![allow(missing_docs, reason = "Benchmark code, relax")]

use std::hint::black_box;
use std::time::Instant;

use criterion::{Criterion, criterion_group, criterion_main};
use slot_pool::{ObjectPool, PoolRef};

criterion_group!(benches, entrypoint);
criterion_main!(benches);

type Payload = Vec<u8>;

const PAYLOAD_LEN: usize = 256;

fn entrypoint(c: &mut Criterion) {
    let mut group = c.benchmark_group("sp_basic");

    group.bench_function("box_alloc_dealloc", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let mut payload = Box::new(Payload::with_capacity(PAYLOAD_LEN));
                payload.push(1);
                black_box(&payload);
            }

            start.elapsed()
        });
    });

    group.bench_function("fetch_release", |b| {
        let pool = ObjectPool::<Payload>::new(1, 1);

        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let mut slot = pool.fetch();
                slot.value_mut().push(1);
                black_box(slot.get());
                pool.release(slot);
            }

            start.elapsed()
        });
    });

    group.bench_function("pool_ref_rebind", |b| {
        let pool = ObjectPool::<Payload>::new(1, 1);
        let mut handle = PoolRef::new(&pool);

        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let payload = handle.fetch_from_pool();
                payload.clear();
                payload.push(1);
                black_box(&*payload);
                handle.return_to_pool();
            }

            start.elapsed()
        });
    });

    group.bench_function("fallback_fetch_release", |b| {
        let pool = ObjectPool::<Payload>::new(1, 1);
        let held = pool.fetch();

        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let mut slot = pool.fetch();
                slot.value_mut().reserve(PAYLOAD_LEN);
                black_box(slot.get());
                pool.release(slot);
            }

            start.elapsed()
        });

        pool.release(held);
    });

    group.bench_function("expand_to_max", |b| {
        b.iter_custom(|iters| {
            let start = Instant::now();

            for _ in 0..iters {
                let pool = ObjectPool::<Payload>::new(1, 64);
                let slots: Vec<_> = (0..64).map(|_| pool.fetch()).collect();

                for slot in slots {
                    pool.release(slot);
                }

                black_box(pool.size());
            }

            start.elapsed()
        });
    });

    group.finish();
}
