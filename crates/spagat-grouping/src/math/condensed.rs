//! Condensed (upper-triangle) storage of symmetric hollow matrices.
//!
//! For `n` regions the condensed vector holds the `n * (n - 1) / 2` entries
//! above the diagonal in row-major order: `(0,1), (0,2), .., (0,n-1), (1,2), ..`.
//! Pair `(x, y)` with `x < y` lives at
//!
//! ```text
//! n*x - x*(x+1)/2 + (y - x - 1)
//! ```
//!
//! which is the same order `to_condensed` writes and any standard
//! agglomerative clustering routine reads.
use ndarray::{Array1, Array2};

use crate::error::{GroupingError, Result};

pub fn condensed_len(n: usize) -> usize {
    n * n.saturating_sub(1) / 2
}

/// Position of the unordered pair `{x, y}` in the condensed vector.
///
/// Returns `None` for `x == y` (the diagonal is not stored) or an index out of range.
pub fn condensed_index(n: usize, x: usize, y: usize) -> Option<usize> {
    if x == y || x >= n || y >= n {
        return None;
    }
    let (x, y) = if x < y { (x, y) } else { (y, x) };
    Some(n * x - x * (x + 1) / 2 + (y - x - 1))
}

/// Inverse of [`condensed_index`]: the pair `(x, y)`, `x < y`, stored at `k`.
pub fn condensed_pair(n: usize, k: usize) -> Option<(usize, usize)> {
    let mut remaining = k;
    for x in 0..n.saturating_sub(1) {
        let row_len = n - x - 1;
        if remaining < row_len {
            return Some((x, x + 1 + remaining));
        }
        remaining -= row_len;
    }
    None
}

fn ensure_square(matrix: &Array2<f64>, context: &str) -> Result<usize> {
    let (rows, cols) = matrix.dim();
    if rows != cols {
        return Err(GroupingError::ShapeMismatch {
            context: context.to_string(),
            expected: vec![rows, rows],
            found: vec![rows, cols],
        });
    }
    Ok(rows)
}

/// Upper triangle of a square matrix, row-major. The diagonal and lower
/// triangle are not inspected.
pub fn to_condensed(matrix: &Array2<f64>) -> Result<Array1<f64>> {
    let n = ensure_square(matrix, "condensed conversion")?;
    let mut values = Vec::with_capacity(condensed_len(n));
    for x in 0..n {
        for y in (x + 1)..n {
            values.push(matrix[[x, y]]);
        }
    }
    Ok(Array1::from_vec(values))
}

/// Hollow symmetric `n × n` matrix from its condensed form.
pub fn from_condensed(vector: &Array1<f64>, n: usize) -> Result<Array2<f64>> {
    if vector.len() != condensed_len(n) {
        return Err(GroupingError::ShapeMismatch {
            context: "condensed vector".to_string(),
            expected: vec![condensed_len(n)],
            found: vec![vector.len()],
        });
    }
    let mut matrix = Array2::zeros((n, n));
    let mut k = 0;
    for x in 0..n {
        for y in (x + 1)..n {
            matrix[[x, y]] = vector[k];
            matrix[[y, x]] = vector[k];
            k += 1;
        }
    }
    Ok(matrix)
}

/// `M + Mᵀ - diag(M)`: mirrors a matrix filled only above the diagonal.
pub fn symmetrize_upper(matrix: &mut Array2<f64>) -> Result<()> {
    let n = ensure_square(matrix, "symmetrize")?;
    for x in 0..n {
        for y in (x + 1)..n {
            let sum = matrix[[x, y]] + matrix[[y, x]];
            matrix[[x, y]] = sum;
            matrix[[y, x]] = sum;
        }
    }
    Ok(())
}
