//! Inverse sampling over a prefix-sum probability table.
//!
//! Generators draw a uniform real and map it to an element through the
//! normalized inclusive prefix sums of the desired degree sequence. The
//! table satisfies `P[0] = 0`, `P[n] = 1`, non-decreasing; element `k` owns
//! the half-open interval `[P[k], P[k+1])`.

use crate::error::{HyperloomError, Result};

/// Index of the element whose probability interval contains `r`.
///
/// Finds the smallest `i` with `prefix[i] > r` by exponential search from
/// the front followed by a linear walk back, and returns `i - 1`; `O(log n)`
/// on average for skewed degree distributions whose mass sits early.
///
/// ```rust
/// # use hyperloom::algs::sample::random_element;
/// let prefix = [0.0, 0.25, 0.5, 0.75, 1.0];
/// assert_eq!(random_element(&prefix, 0.5).unwrap(), 2);
/// ```
pub fn random_element(prefix: &[f64], r: f64) -> Result<usize> {
    debug_assert!(prefix.len() >= 2, "prefix table needs at least one interval");
    let n = prefix.len() - 1;
    let (low, high) = (prefix[0], prefix[n]);
    if !(r >= low && r <= high) {
        return Err(HyperloomError::SampleOutOfRange { r, low, high });
    }
    if r >= prefix[n - 1] {
        return Ok(n - 1);
    }

    // Exponential search: double until the prefix passes r...
    let mut idx = 1usize;
    while idx < n && prefix[idx] <= r {
        idx = (idx * 2).min(n);
    }
    // ...then walk back to the smallest index that still passes.
    while idx > 1 && prefix[idx - 1] > r {
        idx -= 1;
    }
    Ok(idx - 1)
}

/// Normalized inclusive prefix sums of a weight sequence:
/// `P[0] = 0 ≤ P[1] ≤ … ≤ P[n] = 1`.
///
/// An all-zero sequence yields a degenerate table that assigns the whole
/// interval to the last element.
pub fn normalized_prefix(weights: &[f64]) -> Vec<f64> {
    let total: f64 = weights.iter().sum();
    let mut prefix = Vec::with_capacity(weights.len() + 1);
    prefix.push(0.0);
    if total <= 0.0 {
        for i in 1..=weights.len() {
            prefix.push(if i == weights.len() { 1.0 } else { 0.0 });
        }
        return prefix;
    }
    let mut acc = 0.0;
    for &w in weights {
        acc += w;
        prefix.push(acc / total);
    }
    // Pin the tail to exactly 1 despite rounding.
    if let Some(last) = prefix.last_mut() {
        *last = 1.0;
    }
    prefix
}
