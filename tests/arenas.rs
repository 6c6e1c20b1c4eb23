mod common;

use art_index::{
    alloc::{BumpArena, HeapPages, HugePageSize, HugePages, NodeAllocator, PoolArena},
    ArtConfig, ArtIndex, BigEndianRowId,
};
use common::{assert_all_found, key, shuffled};

fn fill<A: NodeAllocator>(arena: A, values: &[u64]) -> ArtIndex<BigEndianRowId, A> {
    let mut index = ArtIndex::new(ArtConfig::new(8), BigEndianRowId, arena).unwrap();
    for &value in values {
        assert!(index.insert(&key(8, value), value));
    }
    index
}

#[test]
fn small_heap_pages() {
    let values = shuffled(50_000);
    let arena = BumpArena::new(HeapPages::with_page_size(16 * 1024)).unwrap();
    let index = fill(arena, &values);

    assert!(index.num_pages() > 1);
    assert!(index.arena().allocated_bytes() <= index.num_pages() * 16 * 1024);
    assert_all_found(&index, values.iter().copied());
    assert_eq!(index.check_well_formed(), Ok(50_000));
}

#[test]
fn pool_arena() {
    let values = shuffled(50_000);
    let index = fill(PoolArena::new(), &values);

    assert_all_found(&index, values.iter().copied());
    assert_eq!(index.check_well_formed(), Ok(50_000));
}

#[test]
fn heap_pages_in_bumpalo() {
    let bump = bumpalo::Bump::new();
    let values = shuffled(10_000);
    let arena = BumpArena::new(HeapPages::with_page_size_in(64 * 1024, &bump)).unwrap();
    let index = fill(arena, &values);

    assert_all_found(&index, values.iter().copied());
    assert!(bump.allocated_bytes() >= index.num_pages() * 64 * 1024);
}

#[test]
fn pool_arena_in_bumpalo() {
    let bump = bumpalo::Bump::new();
    let values = shuffled(10_000);
    let index = fill(PoolArena::new_in(&bump), &values);

    assert_all_found(&index, values.iter().copied());
}

#[test]
fn compact_into_fresh_arena() {
    let values = shuffled(20_000);
    let mut index = fill(PoolArena::new(), &values);
    for &value in values.iter().filter(|value| *value % 2 == 0) {
        assert!(index.remove(&key(8, value), value));
    }
    let stats = index.stats();
    let bytes_before = index.arena().allocated_bytes();

    index.compact(PoolArena::new()).unwrap();

    assert_eq!(index.stats(), stats);
    assert!(index.arena().allocated_bytes() <= bytes_before);
    assert_all_found(&index, values.iter().copied().filter(|value| value % 2 == 1));
    assert!(index.lookup(&key(8, 2)).is_none());
}

#[test]
fn huge_pages_when_available() {
    for size in [HugePageSize::Transparent, HugePageSize::Size2M] {
        let arena = match BumpArena::new(HugePages::new(size)) {
            Ok(arena) => arena,
            // Most hosts have no huge pages reserved
            Err(err) => {
                eprintln!("skipping {size:?}: {err}");
                continue;
            },
        };
        assert_eq!(arena.source().size(), size);

        let values = shuffled(20_000);
        let index = fill(arena, &values);
        assert_all_found(&index, values.iter().copied());
    }
}

#[test]
fn unknown_numa_node_fails_on_construction() {
    let source = HugePages::new(HugePageSize::Transparent).on_numa_node(4_000);
    assert!(BumpArena::new(source).is_err());
}
