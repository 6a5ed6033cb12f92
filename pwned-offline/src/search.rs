//! Binary search over the sorted, newline-delimited corpus.
//!
//! There is no index and records have variable length, so every probe lands on
//! an arbitrary byte and walks back to the start of its line. The search range
//! is tracked in bytes and only ever moves to record starts; it stops when a
//! probe no longer changes the range.

use std::cmp::Ordering;

/// Width of the hash at the start of every record, in hex characters.
pub const HASH_LEN: usize = 40;

/// Probes are pushed this far past the byte midpoint so that they land in the
/// record following a boundary rather than the one before it.
const MIDPOINT_NUDGE: usize = HASH_LEN / 2;

/// Searches `data` for a record whose first [`HASH_LEN`] bytes equal `target`.
///
/// `data` must be sorted ascending by that prefix; `target` is compared byte-wise,
/// so it has to use the corpus' case (uppercase).
#[inline]
pub fn contains_hash(data: &[u8], target: &[u8]) -> bool {
    if data.is_empty() {
        return false;
    }

    let mut low = 0usize;
    let mut high = record_start(data, data.len());
    let mut last = None;

    while last != Some((low, high)) {
        last = Some((low, high));

        let mid = record_start(data, (low + high) / 2 + MIDPOINT_NUDGE);
        let pivot = &data[mid..data.len().min(mid + HASH_LEN)];

        match target.cmp(pivot) {
            Ordering::Less => high = mid,
            Ordering::Greater => low = mid,
            Ordering::Equal => return true,
        }
    }

    false
}

/// Returns the offset just past the last `\n` before `pos`, or 0 if there is none.
#[inline]
fn record_start(data: &[u8], pos: usize) -> usize {
    let end = pos.min(data.len());
    data[..end].iter().rposition(|&b| b == b'\n').map_or(0, |i| i + 1)
}
