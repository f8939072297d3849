//! Key range helpers
//!
//! A request addresses keys through a `(key, range_end)` pair:
//! - `range_end` empty: the single key `key`
//! - `range_end == NUL_KEY`: every key `>= key`
//! - otherwise: the half-open interval `[key, range_end)`
//!
//! `key == NUL_KEY` together with `range_end == NUL_KEY` selects the whole
//! keyspace. A plain empty `key` is rejected by the store.

/// Sentinel byte sequence: the smallest key, or "end of keyspace" as a range end
pub const NUL_KEY: &[u8] = &[0];

/// Range end selecting every key that starts with `prefix`.
///
/// Increments the last byte that is not `0xFF` and drops everything after it.
/// A prefix made only of `0xFF` bytes (or an empty one) has no upper bound, so
/// the sentinel is returned instead.
pub fn prefix_end(prefix: &[u8]) -> Vec<u8> {
    let mut end = prefix.to_vec();
    while let Some(last) = end.pop() {
        if last < 0xFF {
            end.push(last + 1);
            return end;
        }
    }
    NUL_KEY.to_vec()
}

/// Whether `candidate` falls inside the range addressed by `(key, range_end)`
pub fn range_contains(key: &[u8], range_end: &[u8], candidate: &[u8]) -> bool {
    if range_end.is_empty() {
        return candidate == key;
    }
    if candidate < key {
        return false;
    }
    range_end == NUL_KEY || candidate < range_end
}
