//! Custom region distance over preprocessed dissimilarity inputs.
//!
//! The distance between two regions is a weighted sum of three parts:
//! squared feature differences of the time-series and scalar matrices, and
//! squared condensed dissimilarities of the pairwise variables.
use ndarray::{Array1, Array2};
use rayon::prelude::*;

use crate::config::{GroupingConfig, PartWeights, VariableWeights};
use crate::error::{GroupingError, Result};
use crate::features::FeatureMatrices;
use crate::math::{condensed_index, symmetrize_upper, to_condensed};
use crate::pipeline::{resolve_weights, DissimilarityInput};

/// Sum of squared differences between rows `x` and `y`, scaled by each
/// variable's weight. Pairs with a missing side contribute nothing.
fn feature_part(
    matrices: &FeatureMatrices,
    x: usize,
    y: usize,
    weights: &VariableWeights,
) -> Result<f64> {
    let mut total = 0.0;
    for (name, matrix) in matrices {
        let w = weights.weight(name)?;
        let squared: f64 = matrix
            .row(x)
            .iter()
            .zip(matrix.row(y).iter())
            .map(|(a, b)| a - b)
            .filter(|d| !d.is_nan())
            .map(|d| d * d)
            .sum();
        total += squared * w;
    }
    Ok(total)
}

fn pairwise_part(
    input: &DissimilarityInput,
    x: usize,
    y: usize,
    weights: &VariableWeights,
) -> Result<f64> {
    let mut total = 0.0;
    let Some(k) = condensed_index(input.n_regions, x, y) else {
        return Ok(total);
    };
    for (name, per_component) in &input.pairwise {
        let w = weights.weight(name)?;
        for vector in per_component.values() {
            let value = vector[k];
            // Missing means the two regions are not connected by this component.
            if !value.is_nan() {
                total += value * value * w;
            }
        }
    }
    Ok(total)
}

fn check_region(index: usize, n_regions: usize) -> Result<()> {
    if index >= n_regions {
        return Err(GroupingError::RegionOutOfRange { index, n_regions });
    }
    Ok(())
}

fn weighted_distance(
    input: &DissimilarityInput,
    x: usize,
    y: usize,
    weights: &VariableWeights,
    parts: &PartWeights,
) -> Result<f64> {
    let d_ts = feature_part(&input.time_series, x, y, weights)?;
    let d_scalar = feature_part(&input.scalar, x, y, weights)?;
    let d_pairwise = pairwise_part(input, x, y, weights)?;
    Ok(d_ts * parts.time_series() + d_scalar * parts.scalar() + d_pairwise * parts.pairwise())
}

/// Distance between regions `x` and `y`.
///
/// Without `variable_weights` every variable weighs 1; with them, every
/// variable in `input` must be listed. `part_weights` defaults to `[1, 1, 1]`.
pub fn distance(
    input: &DissimilarityInput,
    x: usize,
    y: usize,
    variable_weights: Option<&VariableWeights>,
    part_weights: Option<&PartWeights>,
) -> Result<f64> {
    input.check_shapes()?;
    check_region(x, input.n_regions)?;
    check_region(y, input.n_regions)?;

    let weights = resolve_weights(variable_weights, input.variable_names());
    let parts = part_weights.copied().unwrap_or_default();
    weighted_distance(input, x, y, &weights, &parts)
}

/// Hollow, symmetric `n_regions × n_regions` matrix of [`distance`] with
/// equal part weights.
pub fn distance_matrix(
    input: &DissimilarityInput,
    variable_weights: Option<&VariableWeights>,
) -> Result<Array2<f64>> {
    distance_matrix_with_parts(input, variable_weights, None)
}

/// [`distance_matrix`] with explicit part weights.
///
/// Rows of the upper triangle are evaluated in parallel; the lower triangle
/// is mirrored afterwards.
pub fn distance_matrix_with_parts(
    input: &DissimilarityInput,
    variable_weights: Option<&VariableWeights>,
    part_weights: Option<&PartWeights>,
) -> Result<Array2<f64>> {
    input.check_shapes()?;
    let n = input.n_regions;
    let weights = resolve_weights(variable_weights, input.variable_names());
    let parts = part_weights.copied().unwrap_or_default();
    for name in input.variable_names() {
        weights.weight(name)?;
    }

    let rows: Vec<Vec<f64>> = (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .map(|j| weighted_distance(input, i, j, &weights, &parts))
                .collect::<Result<Vec<f64>>>()
        })
        .collect::<Result<Vec<_>>>()?;

    let mut matrix = Array2::zeros((n, n));
    for (i, row) in rows.into_iter().enumerate() {
        for (offset, d) in row.into_iter().enumerate() {
            matrix[[i, i + 1 + offset]] = d;
        }
    }
    symmetrize_upper(&mut matrix)?;

    log::debug!("Computed {}x{} region distance matrix", n, n);
    Ok(matrix)
}

/// [`distance_matrix_with_parts`] with variable and part weights taken from
/// `config`.
pub fn distance_matrix_with_config(
    input: &DissimilarityInput,
    config: &GroupingConfig,
) -> Result<Array2<f64>> {
    distance_matrix_with_parts(
        input,
        config.variable_weights.as_ref(),
        Some(&config.part_weights),
    )
}

/// Condensed form of a distance matrix, as consumed by agglomerative
/// clustering routines.
pub fn condensed_distance_vector(matrix: &Array2<f64>) -> Result<Array1<f64>> {
    to_condensed(matrix)
}
