//! Per-category preprocessors.
//!
//! Each turns the classified, component-first arrays of one category into
//! the scaled structures used downstream: region × feature matrices for
//! time-series and scalar variables, and per-component region × region data
//! for pairwise variables.
use std::collections::BTreeMap;

use ndarray::{concatenate, Array1, Array2, ArrayView2, Axis};

use crate::config::HandleMode;
use crate::dataset::{valid_components, COMPONENT_DIM, REGION_DIM, REGION_DIM_2};
use crate::error::{GroupingError, Result};
use crate::math::{to_condensed, LabeledArray};
use crate::preprocessing::{fit_transform, scale_unit};

/// Variable name → region × feature matrix.
pub type FeatureMatrices = BTreeMap<String, Array2<f64>>;

/// Variable name → valid component index → scaled region × region matrix.
pub type PairwiseMatrices = BTreeMap<String, BTreeMap<usize, Array2<f64>>>;

/// Variable name → valid component index → condensed dissimilarity vector.
pub type PairwiseVectors = BTreeMap<String, BTreeMap<usize, Array1<f64>>>;

#[derive(Debug, Clone)]
pub enum PairwiseFeatures {
    Dissimilarity(PairwiseVectors),
    Affinity(PairwiseMatrices),
}

fn concat_columns(n_regions: usize, blocks: &[ArrayView2<f64>]) -> Result<Array2<f64>> {
    if blocks.is_empty() {
        return Ok(Array2::zeros((n_regions, 0)));
    }
    Ok(concatenate(Axis(1), blocks)?)
}

fn ensure_rows(name: &str, matrix: &Array2<f64>, n_regions: usize) -> Result<()> {
    if matrix.nrows() != n_regions {
        return Err(GroupingError::ShapeMismatch {
            context: format!("region axis of '{}'", name),
            expected: vec![n_regions],
            found: vec![matrix.nrows()],
        });
    }
    Ok(())
}

/// Scale each valid component's region × time-step block to `[0, 1]` on its
/// own, then lay the blocks side by side in component order.
///
/// A variable without valid components yields an `n_regions × 0` matrix.
pub fn preprocess_time_series(
    vars: &BTreeMap<String, LabeledArray>,
    n_regions: usize,
    n_components: usize,
) -> Result<FeatureMatrices> {
    let mut out = FeatureMatrices::new();

    for (name, array) in vars {
        let valid = valid_components(array, n_components)?;

        let mut blocks = Vec::with_capacity(valid.len());
        for &c in &valid {
            let block = array.index_axis(COMPONENT_DIM, c)?.to_array2()?;
            ensure_rows(name, &block, n_regions)?;
            blocks.push(scale_unit(&block));
        }
        let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
        let matrix = concat_columns(n_regions, &views)?;

        log::debug!(
            "Time series '{}': {} of {} components valid, {} feature columns",
            name,
            valid.len(),
            n_components,
            matrix.ncols()
        );
        out.insert(name.clone(), matrix);
    }

    Ok(out)
}

/// Keep the valid components, transpose to region × component and scale each
/// column to `[0, 1]` across regions.
pub fn preprocess_scalar(
    vars: &BTreeMap<String, LabeledArray>,
    n_components: usize,
) -> Result<FeatureMatrices> {
    let mut out = FeatureMatrices::new();

    for (name, array) in vars {
        let valid = valid_components(array, n_components)?;
        let data = array.to_array2()?;
        let matrix = data.select(Axis(0), &valid).reversed_axes();
        out.insert(name.clone(), fit_transform(&matrix));
    }

    Ok(out)
}

/// Permutation that puts the second region axis into the first axis' order,
/// or `None` when both already agree.
fn region_alignment(name: &str, array: &LabeledArray) -> Result<Option<Vec<usize>>> {
    let n1 = array.len_of(REGION_DIM)?;
    let n2 = array.len_of(REGION_DIM_2)?;
    if n1 != n2 {
        return Err(GroupingError::ShapeMismatch {
            context: format!("region axes of '{}'", name),
            expected: vec![n1, n1],
            found: vec![n1, n2],
        });
    }

    let (Some(first), Some(second)) = (array.coords(REGION_DIM), array.coords(REGION_DIM_2))
    else {
        return Ok(None);
    };

    let permutation = first
        .iter()
        .map(|label| {
            second.iter().position(|l| l == label).ok_or_else(|| {
                GroupingError::RegionLabelMismatch {
                    variable: name.to_string(),
                    label: label.clone(),
                }
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    if permutation.iter().enumerate().all(|(i, &p)| i == p) {
        Ok(None)
    } else {
        Ok(Some(permutation))
    }
}

/// Scaled region × region matrices for every valid component, both axes in
/// the same region order.
pub fn pairwise_affinities(
    vars: &BTreeMap<String, LabeledArray>,
    n_components: usize,
) -> Result<PairwiseMatrices> {
    let mut out = PairwiseMatrices::new();

    for (name, array) in vars {
        let permutation = region_alignment(name, array)?;
        let valid = valid_components(array, n_components)?;

        let mut per_component = BTreeMap::new();
        for c in valid {
            let mut matrix = array.index_axis(COMPONENT_DIM, c)?.to_array2()?;
            if let Some(perm) = &permutation {
                matrix = matrix.select(Axis(1), perm);
            }
            per_component.insert(c, scale_unit(&matrix));
        }
        out.insert(name.clone(), per_component);
    }

    Ok(out)
}

/// Condense each scaled matrix to its upper triangle and flip its sense, so
/// that a strong connection becomes a short distance.
pub fn to_dissimilarities(affinities: &PairwiseMatrices) -> Result<PairwiseVectors> {
    let mut out = PairwiseVectors::new();
    for (name, per_component) in affinities {
        let mut vectors = BTreeMap::new();
        for (&c, matrix) in per_component {
            let condensed = to_condensed(matrix)?;
            vectors.insert(c, condensed.mapv(|v| 1.0 - v));
        }
        out.insert(name.clone(), vectors);
    }
    Ok(out)
}

pub fn preprocess_pairwise(
    vars: &BTreeMap<String, LabeledArray>,
    n_components: usize,
    mode: HandleMode,
) -> Result<PairwiseFeatures> {
    let affinities = pairwise_affinities(vars, n_components)?;
    match mode {
        HandleMode::ToAffinity => Ok(PairwiseFeatures::Affinity(affinities)),
        HandleMode::ToDissimilarity => Ok(PairwiseFeatures::Dissimilarity(to_dissimilarities(
            &affinities,
        )?)),
    }
}
