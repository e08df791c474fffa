//! Quality scores for a partition of regions into groups.
//!
//! `modularity` rates a partition against the region adjacency graph,
//! `silhouette_score` against a precomputed distance matrix. The series
//! variants score every level of an aggregation hierarchy produced by an
//! external clustering routine.
use std::collections::{BTreeMap, HashMap};

use ndarray::Array2;
use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{GroupingError, Result};

/// One group of a hierarchy level: its label and the region ids it holds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionGroup {
    pub label: String,
    pub regions: Vec<String>,
}

/// Group count `k` → groups at that level, in the order the clustering
/// routine produced them.
///
/// Serializes as `{k: [{label, regions}, ..]}`. Deserialization also accepts
/// the label-keyed form `{k: {label: [regions]}}`; groups then come in label
/// order, which changes the numbering of groups but none of the scores.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct AggregationHierarchy {
    levels: BTreeMap<usize, Vec<RegionGroup>>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum LevelGroups {
    Listed(Vec<RegionGroup>),
    ByLabel(BTreeMap<String, Vec<String>>),
}

impl From<LevelGroups> for Vec<RegionGroup> {
    fn from(groups: LevelGroups) -> Self {
        match groups {
            LevelGroups::Listed(groups) => groups,
            LevelGroups::ByLabel(groups) => groups
                .into_iter()
                .map(|(label, regions)| RegionGroup { label, regions })
                .collect(),
        }
    }
}

impl<'de> Deserialize<'de> for AggregationHierarchy {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let levels = BTreeMap::<usize, LevelGroups>::deserialize(deserializer)?;
        Ok(Self {
            levels: levels.into_iter().map(|(k, g)| (k, g.into())).collect(),
        })
    }
}

impl AggregationHierarchy {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert_level<L, R>(&mut self, k: usize, groups: Vec<(L, Vec<R>)>)
    where
        L: Into<String>,
        R: Into<String>,
    {
        let groups = groups
            .into_iter()
            .map(|(label, regions)| RegionGroup {
                label: label.into(),
                regions: regions.into_iter().map(Into::into).collect(),
            })
            .collect();
        self.levels.insert(k, groups);
    }

    pub fn with_level<L, R>(mut self, k: usize, groups: Vec<(L, Vec<R>)>) -> Self
    where
        L: Into<String>,
        R: Into<String>,
    {
        self.insert_level(k, groups);
        self
    }

    pub fn level(&self, k: usize) -> Option<&[RegionGroup]> {
        self.levels.get(&k).map(Vec::as_slice)
    }

    pub fn levels(&self) -> impl Iterator<Item = (usize, &[RegionGroup])> {
        self.levels.iter().map(|(k, g)| (*k, g.as_slice()))
    }

    pub fn len(&self) -> usize {
        self.levels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.levels.is_empty()
    }

    /// Integer label per region at level `k`, numbered in group order.
    ///
    /// Fails unless the groups of the level cover every region exactly once.
    pub fn labels_for_level(&self, k: usize, regions: &[String]) -> Result<Vec<usize>> {
        let groups = self
            .level(k)
            .ok_or_else(|| GroupingError::InvalidHierarchy(format!("no level {}", k)))?;
        let index: HashMap<&str, usize> = regions
            .iter()
            .enumerate()
            .map(|(i, r)| (r.as_str(), i))
            .collect();

        let mut labels: Vec<Option<usize>> = vec![None; regions.len()];
        for (label, group) in groups.iter().enumerate() {
            for region in &group.regions {
                let &i = index
                    .get(region.as_str())
                    .ok_or_else(|| GroupingError::UnknownRegion(region.clone()))?;
                if labels[i].replace(label).is_some() {
                    return Err(GroupingError::InvalidHierarchy(format!(
                        "region '{}' appears more than once at level {}",
                        region, k
                    )));
                }
            }
        }

        labels
            .into_iter()
            .enumerate()
            .map(|(i, l)| {
                l.ok_or_else(|| {
                    GroupingError::InvalidHierarchy(format!(
                        "region '{}' is missing at level {}",
                        regions[i], k
                    ))
                })
            })
            .collect()
    }

    /// Every level partitions `regions` into exactly `k` groups.
    pub fn validate(&self, regions: &[String]) -> Result<()> {
        for (k, groups) in self.levels() {
            if groups.len() != k {
                return Err(GroupingError::InvalidHierarchy(format!(
                    "level {} has {} groups",
                    k,
                    groups.len()
                )));
            }
            self.labels_for_level(k, regions)?;
        }
        Ok(())
    }
}

fn ensure_square(matrix: &Array2<f64>, n_labels: usize, context: &str) -> Result<()> {
    let (rows, cols) = matrix.dim();
    if rows != cols || rows != n_labels {
        return Err(GroupingError::ShapeMismatch {
            context: context.to_string(),
            expected: vec![n_labels, n_labels],
            found: vec![rows, cols],
        });
    }
    Ok(())
}

/// Modularity of a partition of the adjacency graph.
///
/// Self-loops are ignored. For every unordered pair of regions sharing a
/// label, `A[v,w] - d(v) d(w) / 2m` is accumulated, where `d` is the weighted
/// degree and `m` the total edge weight; the sum is divided by `2m`. The
/// result lies in `[-0.5, 1)`. A total weight that is not a positive finite
/// number (no edges, or missing entries) is rejected.
pub fn modularity<L: PartialEq>(adjacency: &Array2<f64>, labels: &[L]) -> Result<f64> {
    ensure_square(adjacency, labels.len(), "modularity adjacency")?;
    let n = labels.len();

    let mut graph = adjacency.to_owned();
    graph.diag_mut().fill(0.0);

    let total_weight = graph.sum();
    if !(total_weight > 0.0) || !total_weight.is_finite() {
        return Err(GroupingError::ZeroEdgeWeight);
    }
    let degrees: Vec<f64> = graph.rows().into_iter().map(|row| row.sum()).collect();

    let mut q = 0.0;
    for v in 0..n {
        for w in (v + 1)..n {
            if labels[v] == labels[w] {
                q += graph[[v, w]] - degrees[v] * degrees[w] / (2.0 * total_weight);
            }
        }
    }

    Ok(q / (2.0 * total_weight))
}

/// Mean silhouette coefficient of `labels` over a precomputed distance
/// matrix.
///
/// Needs between 2 and `n - 1` distinct labels. Members of singleton
/// clusters score 0.
pub fn silhouette_score(distances: &Array2<f64>, labels: &[usize]) -> Result<f64> {
    ensure_square(distances, labels.len(), "silhouette distances")?;
    let n = labels.len();

    let mut dense: HashMap<usize, usize> = HashMap::new();
    for &l in labels {
        let next = dense.len();
        dense.entry(l).or_insert(next);
    }
    let k = dense.len();
    if k < 2 || k >= n {
        return Err(GroupingError::InvalidLabels(format!(
            "{} distinct labels for {} samples; valid values are 2 to n_samples - 1",
            k, n
        )));
    }
    let labels: Vec<usize> = labels.iter().map(|l| dense[l]).collect();

    let mut sizes = vec![0usize; k];
    for &l in &labels {
        sizes[l] += 1;
    }

    let mut total = 0.0;
    for i in 0..n {
        let own = labels[i];
        if sizes[own] == 1 {
            continue;
        }
        let mut sums = vec![0.0; k];
        for j in 0..n {
            if i != j {
                sums[labels[j]] += distances[[i, j]];
            }
        }
        let a = sums[own] / (sizes[own] - 1) as f64;
        let b = (0..k)
            .filter(|&c| c != own)
            .map(|c| sums[c] / sizes[c] as f64)
            .fold(f64::INFINITY, f64::min);

        let denom = a.max(b);
        if denom > 0.0 {
            total += (b - a) / denom;
        }
    }

    Ok(total / n as f64)
}

/// Silhouette score of every intermediate hierarchy level.
///
/// Entry `k - 2` holds level `k` for `k` in `2..n_regions`; levels 1 and
/// `n_regions` have no silhouette and are skipped. Entries for levels absent
/// from the hierarchy stay 0.
pub fn silhouette_series(
    regions: &[String],
    distances: &Array2<f64>,
    hierarchy: &AggregationHierarchy,
) -> Result<Vec<f64>> {
    let n = regions.len();
    ensure_square(distances, n, "silhouette distances")?;
    let mut scores = vec![0.0; n.saturating_sub(2)];

    for (k, _) in hierarchy.levels() {
        if k == 1 || k == n {
            continue;
        }
        if k == 0 || k > n {
            return Err(GroupingError::InvalidHierarchy(format!(
                "level {} outside 1..={}",
                k, n
            )));
        }
        let labels = hierarchy.labels_for_level(k, regions)?;
        scores[k - 2] = silhouette_score(distances, &labels)?;
    }

    log::debug!("Silhouette scores for {} levels", scores.len());
    Ok(scores)
}

/// Modularity of every hierarchy level; entry `k - 1` holds level `k`.
/// Entries for levels absent from the hierarchy stay 0.
pub fn modularity_series(
    regions: &[String],
    adjacency: &Array2<f64>,
    hierarchy: &AggregationHierarchy,
) -> Result<Vec<f64>> {
    let n = regions.len();
    let mut scores = vec![0.0; n];

    for (k, _) in hierarchy.levels() {
        if k == 0 || k > n {
            return Err(GroupingError::InvalidHierarchy(format!(
                "level {} outside 1..={}",
                k, n
            )));
        }
        let labels = hierarchy.labels_for_level(k, regions)?;
        scores[k - 1] = modularity(adjacency, &labels)?;
    }

    Ok(scores)
}
