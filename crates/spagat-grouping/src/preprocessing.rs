//! Min-max scaling shared by the category preprocessors.
//!
//! `scale_matrix` rescales a whole array with its global extrema;
//! `MinMaxScaler` does the same per column (feature-wise). Missing values
//! (`NaN`) are ignored when finding extrema and stay missing in the output.
//! A constant matrix has no range to stretch and is returned unchanged by
//! `scale_matrix`; the feature-wise scaler maps a constant column to `lo`.

use ndarray::{Array, Array2, ArrayBase, Axis, Data, Dimension};

/// Per-column min/max fitted on a feature matrix (rows are samples).
#[derive(Clone, Debug)]
pub struct MinMaxScaler {
    pub min: Vec<f64>,
    pub max: Vec<f64>,
    pub range: (f64, f64),
}

/// Smallest and largest present value, or `None` when nothing is present.
pub(crate) fn nan_min_max<'a, I>(values: I) -> Option<(f64, f64)>
where
    I: IntoIterator<Item = &'a f64>,
{
    values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold(None, |acc, &v| match acc {
            None => Some((v, v)),
            Some((lo, hi)) => Some((lo.min(v), hi.max(v))),
        })
}

fn rescale(v: f64, min: f64, max: f64, lo: f64, hi: f64) -> f64 {
    (v - min) / (max - min) * (hi - lo) + lo
}

/// Linearly map all values of `matrix` into `[lo, hi]` using its global
/// minimum and maximum.
pub fn scale_matrix<S, D>(matrix: &ArrayBase<S, D>, lo: f64, hi: f64) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    match nan_min_max(matrix.iter()) {
        Some((min, max)) if max > min => matrix.mapv(|v| rescale(v, min, max, lo, hi)),
        _ => matrix.to_owned(),
    }
}

/// [`scale_matrix`] into `[0, 1]`.
pub fn scale_unit<S, D>(matrix: &ArrayBase<S, D>) -> Array<f64, D>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    scale_matrix(matrix, 0.0, 1.0)
}

/// Fit a `MinMaxScaler` from a matrix where rows are samples and columns
/// are features.
pub fn fit_scaler(x: &Array2<f64>, lo: f64, hi: f64) -> MinMaxScaler {
    let mut min = Vec::with_capacity(x.ncols());
    let mut max = Vec::with_capacity(x.ncols());
    for column in x.axis_iter(Axis(1)) {
        let (c_min, c_max) = nan_min_max(column.iter()).unwrap_or((f64::NAN, f64::NAN));
        min.push(c_min);
        max.push(c_max);
    }
    MinMaxScaler {
        min,
        max,
        range: (lo, hi),
    }
}

/// Transform all rows using the provided `MinMaxScaler`.
///
/// A constant column maps to the lower bound of the range. Entirely missing
/// columns are copied through unchanged.
pub fn transform_all(x: &Array2<f64>, sc: &MinMaxScaler) -> Array2<f64> {
    let (lo, hi) = sc.range;
    let mut out = x.to_owned();
    for (c, mut column) in out.axis_iter_mut(Axis(1)).enumerate() {
        let (min, max) = (sc.min[c], sc.max[c]);
        if max > min {
            column.mapv_inplace(|v| rescale(v, min, max, lo, hi));
        } else if min.is_finite() {
            column.mapv_inplace(|v| if v.is_nan() { v } else { lo });
        }
    }
    out
}

/// Fit a scaler into `[0, 1]` and return the transformed matrix in one call.
pub fn fit_transform(x: &Array2<f64>) -> Array2<f64> {
    let sc = fit_scaler(x, 0.0, 1.0);
    transform_all(x, &sc)
}
