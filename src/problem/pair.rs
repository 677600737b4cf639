use crate::error::PairError;

/// Number of unordered pairs over `n` nodes.
pub fn pair_count(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Maps the unordered pair `{a, b}` over `n` nodes onto `[0, n(n-1)/2)`.
///
/// Keys are laid out row by row: all pairs `(0, _)` first, then `(1, _)`, and so
/// on, so the offset of row `lo` is a difference of two triangular numbers and the
/// key is computed in constant time.
///
/// # Errors
///
/// * [`PairError::OutOfRange`] if either index is `>= n`
/// * [`PairError::Identical`] if `a == b`
///
/// # Examples
///
/// ```
/// use pathsel::problem::hash_pair;
///
/// assert_eq!(hash_pair(0, 1, 4).unwrap(), 0);
/// assert_eq!(hash_pair(3, 2, 4).unwrap(), 5);
/// assert_eq!(hash_pair(1, 2, 4), hash_pair(2, 1, 4));
/// ```
pub fn hash_pair(a: usize, b: usize, n: usize) -> Result<usize, PairError> {
    if a >= n || b >= n {
        return Err(PairError::OutOfRange { a, b, n });
    }
    if a == b {
        return Err(PairError::Identical { a });
    }
    let (lo, hi) = if a < b { (a, b) } else { (b, a) };
    Ok(row_offset(lo, n) + hi - 1)
}

/// Signed variant of [`hash_pair`] for callers holding untrusted indices.
pub fn hash_pair_signed(a: i64, b: i64, n: usize) -> Result<usize, PairError> {
    match (usize::try_from(a), usize::try_from(b)) {
        (Ok(a), Ok(b)) => hash_pair(a, b, n),
        _ => Err(PairError::Negative { a, b }),
    }
}

/// Iterates `(a, b, key)` for every `a < b < n`, in increasing key order.
pub fn pairs(n: usize) -> impl Iterator<Item = (usize, usize, usize)> {
    (0..n)
        .flat_map(move |a| (a + 1..n).map(move |b| (a, b)))
        .enumerate()
        .map(|(key, (a, b))| (a, b, key))
}

// Key of `(lo, lo + 1)` minus `lo`; callers add `hi - 1`.
fn row_offset(lo: usize, n: usize) -> usize {
    triangular(n - 1) - triangular(n - lo - 1)
}

fn triangular(k: usize) -> usize {
    k * k.saturating_sub(1) / 2
}
