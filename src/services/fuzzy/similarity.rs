//! Levenshtein distance and normalized similarity.
//!
//! Both functions operate on Unicode scalar values, so `"张三"` has length 2.

// Lengths are name lengths; the f64 conversion is exact far beyond that.
#![allow(clippy::cast_precision_loss)]

/// Computes the Levenshtein edit distance between `a` and `b`.
///
/// Insertions, deletions and substitutions each cost 1.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::fuzzy::edit_distance;
///
/// assert_eq!(edit_distance("张三", "张三丰"), 1);
/// assert_eq!(edit_distance("", "青铜"), 2);
/// ```
#[must_use]
pub fn edit_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();

    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    // Two rows of the (|a|+1) x (|b|+1) table.
    let mut previous: Vec<usize> = (0..=b.len()).collect();
    let mut current = vec![0; b.len() + 1];

    for (i, ca) in a.iter().enumerate() {
        current[0] = i + 1;
        for (j, cb) in b.iter().enumerate() {
            let substitution = previous[j] + usize::from(ca != cb);
            let deletion = previous[j + 1] + 1;
            let insertion = current[j] + 1;
            current[j + 1] = substitution.min(deletion).min(insertion);
        }
        std::mem::swap(&mut previous, &mut current);
    }

    previous[b.len()]
}

/// Normalized similarity in `[0, 1]`.
///
/// `(max_len - distance) / max_len`, and `1.0` when both strings are empty.
///
/// # Example
///
/// ```rust
/// use heritage_kg::services::fuzzy::similarity;
///
/// assert!((similarity("张三丰", "张三") - 2.0 / 3.0).abs() < 1e-9);
/// assert!((similarity("", "") - 1.0).abs() < f64::EPSILON);
/// ```
#[must_use]
pub fn similarity(a: &str, b: &str) -> f64 {
    let max_len = a.chars().count().max(b.chars().count());
    if max_len == 0 {
        return 1.0;
    }
    let distance = edit_distance(a, b);
    (max_len - distance) as f64 / max_len as f64
}
