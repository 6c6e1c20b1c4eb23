use crate::common::{build_index, key, KeyDistribution, KEY_LEN};
use art_index::{alloc::PoolArena, ArtConfig, ArtIndex, BigEndianRowId};
use criterion::{criterion_group, BatchSize, Criterion, Throughput};

const NUM_KEYS: usize = 100_000;

fn bench(c: &mut Criterion) {
    let mut group = c.benchmark_group("insert");
    group.throughput(Throughput::Elements(NUM_KEYS as u64));

    for distribution in KeyDistribution::ALL {
        let values = distribution.generate(NUM_KEYS);

        group.bench_function(format!("bump/{}", distribution.name()), |b| {
            b.iter(|| build_index(&values))
        });
        group.bench_function(format!("pool/{}", distribution.name()), |b| {
            b.iter(|| {
                let mut index =
                    ArtIndex::new(ArtConfig::new(KEY_LEN), BigEndianRowId, PoolArena::new())
                        .unwrap();
                for &value in &values {
                    index.insert(&key(value), value);
                }
                index
            })
        });
        group.bench_function(format!("remove/{}", distribution.name()), |b| {
            b.iter_batched(
                || build_index(&values),
                |mut index| {
                    for &value in &values {
                        index.remove(&key(value), value);
                    }
                    index
                },
                BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

criterion_group!(bench_insert_group, bench);
