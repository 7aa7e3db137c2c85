use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use kvengine_engine::Engine;
use kvengine_store_robinhood::RobinhoodEngine;

fn seeded(n: usize) -> RobinhoodEngine {
    let engine = RobinhoodEngine::in_memory();
    for i in 0..n {
        let k = (i as u64).to_le_bytes();
        engine.put(&k, &k).unwrap();
    }
    engine
}

fn put_get(c: &mut Criterion) {
    let mut group = c.benchmark_group("robinhood_put_get");
    for size in [100usize, 10_000] {
        let engine = seeded(size);
        group.bench_with_input(BenchmarkId::new("get", size), &size, |b, _| {
            let k = ((size / 2) as u64).to_le_bytes();
            b.iter(|| engine.get(&k).unwrap());
        });
        group.bench_with_input(BenchmarkId::new("put", size), &size, |b, _| {
            let k = (size as u64).to_le_bytes();
            b.iter(|| engine.put(&k, &k).unwrap());
        });
    }
    group.finish();
}

criterion_group!(benches, put_get);
criterion_main!(benches);
