//! Deterministic "featured of the day" selection.
//!
//! The snapshot is shuffled with a generator seeded by the year, then walked
//! one position per day. Every item is featured once before any repeats, and
//! the pick for a given snapshot ordering and date never changes across
//! restarts. The generator is not cryptographic and must not be used where
//! unpredictability matters.

use chrono::{Datelike, NaiveDate};

// SplitMix64 finaliser; one output per seed value.
fn splitmix64(seed: u64) -> u64 {
    let mut z = seed.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Fisher-Yates permutation of `0..len`, reproducible for a given `seed`.
///
/// The seed advances by one after every swap decision.
pub fn seeded_permutation(len: usize, seed: u64) -> Vec<usize> {
    let mut perm: Vec<usize> = (0..len).collect();
    let mut seed = seed;
    for i in (1..len).rev() {
        let bound = (i + 1) as u128;
        let j = ((u128::from(splitmix64(seed)) * bound) >> 64) as usize;
        seed = seed.wrapping_add(1);
        perm.swap(i, j);
    }
    perm
}

/// Shuffled copy of `items`
pub fn seeded_shuffle<T: Clone>(items: &[T], seed: u64) -> Vec<T> {
    seeded_permutation(items.len(), seed)
        .into_iter()
        .map(|i| items[i].clone())
        .collect()
}

fn year_seed(date: NaiveDate) -> u64 {
    i64::from(date.year()) as u64
}

/// The featured item for `date`, or `None` for an empty snapshot
pub fn select_for_date<T>(items: &[T], date: NaiveDate) -> Option<&T> {
    if items.is_empty() {
        return None;
    }
    let perm = seeded_permutation(items.len(), year_seed(date));
    // ordinal0: Jan 1 is 0
    let index = date.ordinal0() as usize % perm.len();
    items.get(perm[index])
}
