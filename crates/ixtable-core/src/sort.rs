//! Stable merge sort over a comparator.
//!
//! The table engine sorts already-materialized rows by a caller-supplied
//! comparator (`SortBy::cmp`), never by a `Variant` ordering directly, so
//! this helper is generic over the comparator rather than over `Variant`.
//! Multi-key sort applies each `SortBy` entry right-to-left so the
//! leftmost key ends up dominant, which is cheaper than composing all
//! the comparators into one up front.

use std::cmp::Ordering;

/// Stable merge sort. `cmp` must be a total order consistent across calls;
/// ties keep their relative input order.
pub fn merge_sort<T: Clone>(items: &mut Vec<T>, cmp: impl Fn(&T, &T) -> Ordering) {
    let len = items.len();
    if len <= 1 {
        return;
    }
    let mut buffer = items.clone();
    merge_sort_range(items, &mut buffer, 0, len, &cmp);
}

fn merge_sort_range<T: Clone>(
    items: &mut [T],
    buffer: &mut [T],
    lo: usize,
    hi: usize,
    cmp: &impl Fn(&T, &T) -> Ordering,
) {
    if hi - lo <= 1 {
        return;
    }
    let mid = lo + (hi - lo) / 2;
    merge_sort_range(items, buffer, lo, mid, cmp);
    merge_sort_range(items, buffer, mid, hi, cmp);

    buffer[lo..hi].clone_from_slice(&items[lo..hi]);

    let (mut i, mut j, mut k) = (lo, mid, lo);
    while i < mid && j < hi {
        // `<=` keeps the merge stable: ties preserve left-run order.
        if cmp(&buffer[i], &buffer[j]) != Ordering::Greater {
            items[k] = buffer[i].clone();
            i += 1;
        } else {
            items[k] = buffer[j].clone();
            j += 1;
        }
        k += 1;
    }
    while i < mid {
        items[k] = buffer[i].clone();
        i += 1;
        k += 1;
    }
    while j < hi {
        items[k] = buffer[j].clone();
        j += 1;
        k += 1;
    }
}

/// Apply a sequence of sort keys right-to-left so that `keys[0]` is the
/// dominant ordering in the final result.
pub fn merge_sort_by_keys<T: Clone, K>(items: &mut Vec<T>, keys: &[K], cmp_key: impl Fn(&K, &T, &T) -> Ordering) {
    for key in keys.iter().rev() {
        merge_sort(items, |a, b| cmp_key(key, a, b));
    }
}
