//! Dataset-level preprocessing.
//!
//! Classifies the dataset's variables, runs the three category
//! preprocessors and shapes the result for one of the two consumers: the
//! custom distance (dissimilarity mode) or an affinity-based method.
use ndarray::{Array2, ArrayView2};

use crate::config::{GroupingConfig, HandleMode, VariableWeights};
use crate::dataset::Dataset;
use crate::error::{GroupingError, Result};
use crate::features::{
    pairwise_affinities, preprocess_scalar, preprocess_time_series, to_dissimilarities,
    FeatureMatrices, PairwiseVectors,
};

/// Inputs of the custom region distance. Weighting is applied per distance
/// call, so nothing here is weighted yet.
#[derive(Debug, Clone)]
pub struct DissimilarityInput {
    pub n_regions: usize,
    pub time_series: FeatureMatrices,
    pub scalar: FeatureMatrices,
    pub pairwise: PairwiseVectors,
}

impl DissimilarityInput {
    pub fn new(
        n_regions: usize,
        time_series: FeatureMatrices,
        scalar: FeatureMatrices,
        pairwise: PairwiseVectors,
    ) -> Result<Self> {
        let input = Self {
            n_regions,
            time_series,
            scalar,
            pairwise,
        };
        input.check_shapes()?;
        Ok(input)
    }

    pub fn variable_names(&self) -> impl Iterator<Item = &str> {
        self.time_series
            .keys()
            .chain(self.scalar.keys())
            .chain(self.pairwise.keys())
            .map(String::as_str)
    }

    /// Every feature matrix has one row per region and every condensed
    /// vector one entry per region pair.
    pub fn check_shapes(&self) -> Result<()> {
        for (name, matrix) in self.time_series.iter().chain(self.scalar.iter()) {
            if matrix.nrows() != self.n_regions {
                return Err(GroupingError::ShapeMismatch {
                    context: format!("feature matrix '{}'", name),
                    expected: vec![self.n_regions],
                    found: vec![matrix.nrows()],
                });
            }
        }
        let expected = crate::math::condensed_len(self.n_regions);
        for (name, per_component) in &self.pairwise {
            for (c, vector) in per_component {
                if vector.len() != expected {
                    return Err(GroupingError::ShapeMismatch {
                        context: format!("condensed vector '{}' component {}", name, c),
                        expected: vec![expected],
                        found: vec![vector.len()],
                    });
                }
            }
        }
        Ok(())
    }
}

/// Weighted, combined matrices for affinity-based methods.
#[derive(Debug, Clone)]
pub struct AffinityInput {
    /// Region × (all time-series feature columns).
    pub time_series: Array2<f64>,
    /// Region × (all scalar feature columns).
    pub scalar: Array2<f64>,
    /// Weighted sum of every pairwise (variable, component) matrix.
    pub affinity: Array2<f64>,
}

#[derive(Debug, Clone)]
pub enum Preprocessed {
    Dissimilarity(DissimilarityInput),
    Affinity(AffinityInput),
}

impl Preprocessed {
    pub fn into_dissimilarity(self) -> Option<DissimilarityInput> {
        match self {
            Preprocessed::Dissimilarity(input) => Some(input),
            Preprocessed::Affinity(_) => None,
        }
    }

    pub fn into_affinity(self) -> Option<AffinityInput> {
        match self {
            Preprocessed::Affinity(input) => Some(input),
            Preprocessed::Dissimilarity(_) => None,
        }
    }
}

/// Classify and preprocess every variable of `dataset` for `mode`.
///
/// `variable_weights` is only used in affinity mode. When it is `None` every
/// variable weighs 1; otherwise each variable must be listed.
pub fn preprocess_dataset(
    dataset: &Dataset,
    mode: HandleMode,
    variable_weights: Option<&VariableWeights>,
) -> Result<Preprocessed> {
    match mode {
        HandleMode::ToDissimilarity => {
            preprocess_for_dissimilarity(dataset).map(Preprocessed::Dissimilarity)
        }
        HandleMode::ToAffinity => {
            preprocess_for_affinity(dataset, variable_weights).map(Preprocessed::Affinity)
        }
    }
}

/// [`preprocess_dataset`] with mode and weights taken from `config`.
pub fn preprocess_with_config(dataset: &Dataset, config: &GroupingConfig) -> Result<Preprocessed> {
    preprocess_dataset(dataset, config.mode, config.variable_weights.as_ref())
}

pub fn preprocess_for_dissimilarity(dataset: &Dataset) -> Result<DissimilarityInput> {
    let n_regions = dataset.n_regions();
    let n_components = dataset.n_components();
    let classified = dataset.classify()?;

    let time_series = preprocess_time_series(&classified.time_series, n_regions, n_components)?;
    let scalar = preprocess_scalar(&classified.scalar, n_components)?;
    let pairwise = to_dissimilarities(&pairwise_affinities(&classified.pairwise, n_components)?)?;

    DissimilarityInput::new(n_regions, time_series, scalar, pairwise)
}

/// Explicit weights as given, or 1 for each listed name when none were supplied.
pub(crate) fn resolve_weights<'a, I>(
    variable_weights: Option<&VariableWeights>,
    names: I,
) -> VariableWeights
where
    I: IntoIterator<Item = &'a str>,
{
    match variable_weights {
        Some(w) => w.clone(),
        None => VariableWeights::uniform(names),
    }
}

fn weighted_concat(
    n_regions: usize,
    matrices: &FeatureMatrices,
    weights: &VariableWeights,
) -> Result<Array2<f64>> {
    let mut blocks = Vec::with_capacity(matrices.len());
    for (name, matrix) in matrices {
        let w = weights.weight(name)?;
        blocks.push(matrix * w);
    }
    if blocks.is_empty() {
        return Ok(Array2::zeros((n_regions, 0)));
    }
    let views: Vec<ArrayView2<f64>> = blocks.iter().map(|b| b.view()).collect();
    Ok(ndarray::concatenate(ndarray::Axis(1), &views)?)
}

pub fn preprocess_for_affinity(
    dataset: &Dataset,
    variable_weights: Option<&VariableWeights>,
) -> Result<AffinityInput> {
    let n_regions = dataset.n_regions();
    let n_components = dataset.n_components();
    let classified = dataset.classify()?;

    let weights = resolve_weights(variable_weights, classified.names());
    if variable_weights.is_none() && !classified.is_empty() {
        log::info!(
            "No variable weights given; all {} variables weigh 1 regardless of category",
            weights.len()
        );
    }

    let time_series = preprocess_time_series(&classified.time_series, n_regions, n_components)?;
    let time_series = weighted_concat(n_regions, &time_series, &weights)?;

    let scalar = preprocess_scalar(&classified.scalar, n_components)?;
    let scalar = weighted_concat(n_regions, &scalar, &weights)?;

    let mut affinity = Array2::<f64>::zeros((n_regions, n_regions));
    for (name, per_component) in pairwise_affinities(&classified.pairwise, n_components)? {
        let w = weights.weight(&name)?;
        for matrix in per_component.values() {
            if matrix.dim() != affinity.dim() {
                return Err(GroupingError::ShapeMismatch {
                    context: format!("pairwise variable '{}'", name),
                    expected: vec![n_regions, n_regions],
                    found: vec![matrix.nrows(), matrix.ncols()],
                });
            }
            // A missing affinity means no connection.
            affinity.zip_mut_with(matrix, |acc, &v| {
                if !v.is_nan() {
                    *acc += v * w;
                }
            });
        }
    }

    log::debug!(
        "Affinity preprocessing: {} time-series columns, {} scalar columns, {}x{} affinity",
        time_series.ncols(),
        scalar.ncols(),
        n_regions,
        n_regions
    );

    Ok(AffinityInput {
        time_series,
        scalar,
        affinity,
    })
}
