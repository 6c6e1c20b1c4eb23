use art_index::{ArtConfig, ArtIndex, BigEndianRowId};
use rand::{rngs::StdRng, seq::SliceRandom, Rng, SeedableRng};
use rand_distr::Zipf;
use std::collections::BTreeSet;

pub const KEY_LEN: usize = 8;

pub fn rng() -> StdRng {
    StdRng::seed_from_u64(0xA27_BE4C)
}

/// The key sets the benchmarks are run against.
#[derive(Debug, Clone, Copy)]
pub enum KeyDistribution {
    /// `1..=n` in ascending order.
    Sorted,
    /// `1..=n` in random order.
    Shuffled,
    /// `n` distinct random 64-bit values.
    Sparse,
}

impl KeyDistribution {
    pub const ALL: [KeyDistribution; 3] = [
        KeyDistribution::Sorted,
        KeyDistribution::Shuffled,
        KeyDistribution::Sparse,
    ];

    pub fn name(self) -> &'static str {
        match self {
            KeyDistribution::Sorted => "sorted",
            KeyDistribution::Shuffled => "shuffled",
            KeyDistribution::Sparse => "sparse",
        }
    }

    pub fn generate(self, n: usize) -> Vec<u64> {
        let mut rng = rng();
        match self {
            KeyDistribution::Sorted => (1..=n as u64).collect(),
            KeyDistribution::Shuffled => {
                let mut values: Vec<u64> = (1..=n as u64).collect();
                values.shuffle(&mut rng);
                values
            },
            KeyDistribution::Sparse => {
                let mut seen = BTreeSet::new();
                let mut values = Vec::with_capacity(n);
                while values.len() < n {
                    let value = rng.random::<u64>();
                    if seen.insert(value) {
                        values.push(value);
                    }
                }
                values
            },
        }
    }
}

pub fn key(value: u64) -> [u8; KEY_LEN] {
    value.to_be_bytes()
}

pub fn build_index(values: &[u64]) -> ArtIndex<BigEndianRowId> {
    let mut index = ArtIndex::with_heap(ArtConfig::new(KEY_LEN), BigEndianRowId).unwrap();
    for &value in values {
        index.insert(&key(value), value);
    }
    index
}

/// `count` probes drawn uniformly from `values`.
pub fn uniform_probes(values: &[u64], count: usize) -> Vec<[u8; KEY_LEN]> {
    let mut rng = rng();
    (0..count)
        .map(|_| key(values[rng.random_range(0..values.len())]))
        .collect()
}

/// `count` probes drawn from `values` with a Zipfian skew towards the front.
pub fn zipf_probes(values: &[u64], count: usize, exponent: f64) -> Vec<[u8; KEY_LEN]> {
    let mut rng = rng();
    let zipf = Zipf::new(values.len() as f64, exponent).unwrap();
    (0..count)
        .map(|_| {
            let rank = rng.sample(zipf) as usize;
            key(values[rank.clamp(1, values.len()) - 1])
        })
        .collect()
}
