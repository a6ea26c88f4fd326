//! Featured item selection

pub mod daily;

pub use daily::*;

use rand::seq::IndexedRandom;

/// Uniformly random item; not reproducible, unlike [`select_for_date`]
pub fn pick_random<T>(items: &[T]) -> Option<&T> {
    items.choose(&mut rand::rng())
}
