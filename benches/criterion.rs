use criterion::criterion_main;

mod common;

criterion_main!(
    tree::insert::bench_insert_group,
    tree::lookup::bench_lookup_group,
    tree::reorganize::bench_reorganize_group,
);
