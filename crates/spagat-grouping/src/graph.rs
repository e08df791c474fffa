//! Region adjacency from pairwise connection data.
use ndarray::Array2;
use rayon::prelude::*;

use crate::config::GroupingConfig;
use crate::dataset::Dataset;
use crate::error::Result;
use crate::features::{pairwise_affinities, PairwiseMatrices};
use crate::math::symmetrize_upper;

/// Indices of components whose name contains `keyword`, ignoring case. When
/// none match, every component connects regions.
pub fn connecting_components(components: &[String], keyword: &str) -> Vec<usize> {
    let keyword = keyword.to_lowercase();
    let matching: Vec<usize> = components
        .iter()
        .enumerate()
        .filter(|(_, name)| name.to_lowercase().contains(&keyword))
        .map(|(i, _)| i)
        .collect();

    if matching.is_empty() {
        (0..components.len()).collect()
    } else {
        matching
    }
}

/// 0/1 adjacency matrix of the regions, with self-loops, using the default
/// "pipeline" keyword to pick the connecting components.
pub fn connectivity(dataset: &Dataset) -> Result<Array2<f64>> {
    connectivity_with_keyword(dataset, GroupingConfig::DEFAULT_CONNECT_KEYWORD)
}

/// [`connectivity_with_keyword`] using the keyword configured in `config`.
pub fn connectivity_with_config(
    dataset: &Dataset,
    config: &GroupingConfig,
) -> Result<Array2<f64>> {
    connectivity_with_keyword(dataset, &config.connect_keyword)
}

/// Two regions are adjacent when any connecting component has a non-zero
/// affinity between them in any pairwise variable.
pub fn connectivity_with_keyword(dataset: &Dataset, keyword: &str) -> Result<Array2<f64>> {
    let n = dataset.n_regions();
    let classified = dataset.classify()?;
    let affinities = pairwise_affinities(&classified.pairwise, dataset.n_components())?;
    let connect = connecting_components(dataset.components(), keyword);

    log::debug!(
        "Connectivity from {} pairwise variables over components {:?}",
        affinities.len(),
        connect
    );

    let rows: Vec<Vec<bool>> = (0..n)
        .into_par_iter()
        .map(|i| {
            ((i + 1)..n)
                .map(|j| check_connectivity(i, j, &affinities, &connect))
                .collect()
        })
        .collect();

    let mut adjacency = Array2::zeros((n, n));
    for (i, row) in rows.into_iter().enumerate() {
        for (offset, connected) in row.into_iter().enumerate() {
            if connected {
                adjacency[[i, i + 1 + offset]] = 1.0;
            }
        }
    }
    symmetrize_upper(&mut adjacency)?;
    adjacency.diag_mut().fill(1.0);

    Ok(adjacency)
}

/// True as soon as one (variable, component) pair among `connect_components`
/// has a present, non-zero affinity between regions `x` and `y`.
pub fn check_connectivity(
    x: usize,
    y: usize,
    affinities: &PairwiseMatrices,
    connect_components: &[usize],
) -> bool {
    affinities.values().any(|per_component| {
        per_component.iter().any(|(c, matrix)| {
            if !connect_components.contains(c) {
                return false;
            }
            let v = matrix[[x, y]];
            !v.is_nan() && v != 0.0
        })
    })
}
