use crate::common::{build_index, uniform_probes, zipf_probes, KeyDistribution};
use criterion::{criterion_group, Criterion, Throughput};
use std::hint::black_box;

const NUM_KEYS: usize = 1_000_000;
const NUM_PROBES: usize = 10_000;

fn bench(c: &mut Criterion) {
    for distribution in KeyDistribution::ALL {
        let values = distribution.generate(NUM_KEYS);
        let index = build_index(&values);

        let probe_sets = [
            ("uniform", uniform_probes(&values, NUM_PROBES)),
            ("zipf", zipf_probes(&values, NUM_PROBES, 1.1)),
        ];

        let mut group = c.benchmark_group(format!("lookup/{}", distribution.name()));
        group.throughput(Throughput::Elements(NUM_PROBES as u64));
        for (probe_name, probes) in &probe_sets {
            group.bench_function(format!("optimistic/{probe_name}"), |b| {
                b.iter(|| {
                    for key in probes {
                        black_box(index.lookup(key));
                    }
                })
            });
            group.bench_function(format!("pessimistic/{probe_name}"), |b| {
                b.iter(|| {
                    for key in probes {
                        black_box(index.lookup_pessimistic(key));
                    }
                })
            });
        }
        group.bench_function("minimum", |b| b.iter(|| index.minimum()));
        group.bench_function("maximum", |b| b.iter(|| index.maximum()));
        group.finish();
    }
}

criterion_group!(bench_lookup_group, bench);
