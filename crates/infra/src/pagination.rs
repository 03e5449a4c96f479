//! Cursor-based pagination over a sorted key listing.
//!
//! The blob store gives us nothing but sorted entry names, so every listing
//! (per-job log replay, cross-job history) pages the same way:
//!
//! 1. If the cursor is one of the keys, start at it (inclusive) in the chosen
//!    direction. If it isn't, start from the beginning; a stale or unknown
//!    cursor is not an error.
//! 2. Take at most `limit` keys in that direction.

use std::collections::BTreeSet;
use std::ops::Bound;

/// Iteration order over the key set.
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Smallest key first (log replay).
    Ascending,
    /// Largest key first (newest-first history).
    Descending,
}

/// Select the page of `keys` to read.
pub fn paginate(
    keys: &BTreeSet<String>,
    direction: Direction,
    cursor: Option<&str>,
    limit: usize,
) -> Vec<String> {
    if limit == 0 {
        return Vec::new();
    }

    let cursor = cursor.filter(|c| keys.contains(*c));

    let ordered: Box<dyn Iterator<Item = &String> + '_> = match (direction, cursor) {
        (Direction::Ascending, Some(c)) => {
            Box::new(keys.range::<str, _>((Bound::Included(c), Bound::Unbounded)))
        }
        (Direction::Ascending, None) => Box::new(keys.iter()),
        (Direction::Descending, Some(c)) => {
            Box::new(keys.range::<str, _>((Bound::Unbounded, Bound::Included(c))).rev())
        }
        (Direction::Descending, None) => Box::new(keys.iter().rev()),
    };

    ordered.take(limit).cloned().collect()
}
