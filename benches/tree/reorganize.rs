use crate::common::{build_index, uniform_probes, KeyDistribution};
use art_index::alloc::{BumpArena, HeapPages, PoolArena};
use criterion::{criterion_group, Criterion, Throughput};
use std::hint::black_box;

const NUM_KEYS: usize = 1_000_000;
const NUM_PROBES: usize = 10_000;

fn bench(c: &mut Criterion) {
    let values = KeyDistribution::Shuffled.generate(NUM_KEYS);
    let index = build_index(&values);
    let probes = uniform_probes(&values, NUM_PROBES);

    let mut group = c.benchmark_group("reorganize");
    group.sample_size(10);
    group.bench_function("into_bump", |b| {
        b.iter(|| index.reorganize(BumpArena::new(HeapPages::new()).unwrap()).unwrap())
    });
    group.bench_function("into_pool", |b| {
        b.iter(|| index.reorganize(PoolArena::new()).unwrap())
    });
    group.finish();

    // Lookups on a tree built in random order against its preorder copy.
    let reorganized = index
        .reorganize(BumpArena::new(HeapPages::new()).unwrap())
        .unwrap();
    let mut group = c.benchmark_group("lookup_after_reorganize");
    group.throughput(Throughput::Elements(NUM_PROBES as u64));
    group.bench_function("original", |b| {
        b.iter(|| {
            for key in &probes {
                black_box(index.lookup(key));
            }
        })
    });
    group.bench_function("reorganized", |b| {
        b.iter(|| {
            for key in &probes {
                black_box(reorganized.lookup(key));
            }
        })
    });
    group.finish();
}

criterion_group!(bench_reorganize_group, bench);
