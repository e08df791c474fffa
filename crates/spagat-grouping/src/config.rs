use std::collections::BTreeMap;
use std::str::FromStr;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::error::{GroupingError, Result};

/// How pairwise (region × region) variables are interpreted.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HandleMode {
    /// Stronger connection means smaller distance; pairwise data is stored condensed.
    #[default]
    #[serde(rename = "toDissimilarity")]
    ToDissimilarity,
    /// Connection strength is kept as is, as a full symmetric matrix.
    #[serde(rename = "toAffinity")]
    ToAffinity,
}

impl FromStr for HandleMode {
    type Err = GroupingError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "todissimilarity" | "dissimilarity" => Ok(HandleMode::ToDissimilarity),
            "toaffinity" | "affinity" => Ok(HandleMode::ToAffinity),
            _ => Err(GroupingError::InvalidMode(s.to_string())),
        }
    }
}

/// Explicit per-variable weights.
///
/// Once a caller supplies a mapping, every variable that takes part in a
/// computation must be listed; lookups never fall back to a default.
#[derive(Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[serde(transparent)]
pub struct VariableWeights(BTreeMap<String, f64>);

impl VariableWeights {
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Weight 1 for every given variable name.
    pub fn uniform<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(names.into_iter().map(|n| (n.into(), 1.0)).collect())
    }

    pub fn with(mut self, name: impl Into<String>, weight: f64) -> Self {
        self.insert(name, weight);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, weight: f64) {
        self.0.insert(name.into(), weight);
    }

    pub fn weight(&self, name: &str) -> Result<f64> {
        self.0
            .get(name)
            .copied()
            .ok_or_else(|| GroupingError::MissingWeight(name.to_string()))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<S: Into<String>> FromIterator<(S, f64)> for VariableWeights {
    fn from_iter<I: IntoIterator<Item = (S, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

/// Weights of the time-series, scalar and pairwise distance parts, in that order.
#[derive(Deserialize, Serialize, Debug, Clone, Copy, PartialEq)]
#[serde(transparent)]
pub struct PartWeights(pub [f64; 3]);

impl PartWeights {
    pub fn new(time_series: f64, scalar: f64, pairwise: f64) -> Self {
        Self([time_series, scalar, pairwise])
    }

    pub fn time_series(&self) -> f64 {
        self.0[0]
    }

    pub fn scalar(&self) -> f64 {
        self.0[1]
    }

    pub fn pairwise(&self) -> f64 {
        self.0[2]
    }
}

impl Default for PartWeights {
    fn default() -> Self {
        Self([1.0, 1.0, 1.0])
    }
}

/// Central configuration for preprocessing, distance computation and the
/// region adjacency graph.
///
/// `mode` and `variable_weights` drive `preprocess_with_config`,
/// `part_weights` drives `distance_matrix_with_config` and `connect_keyword`
/// drives `connectivity_with_config`.
#[derive(Deserialize, Serialize, Debug, Clone, PartialEq)]
#[serde(default)]
pub struct GroupingConfig {
    pub mode: HandleMode,
    pub variable_weights: Option<VariableWeights>,
    pub part_weights: PartWeights,
    /// Components whose name contains this keyword (case-insensitive) are the
    /// ones that connect regions in the adjacency graph.
    pub connect_keyword: String,
}

impl GroupingConfig {
    pub const DEFAULT_CONNECT_KEYWORD: &'static str = "pipeline";

    pub fn new(mode: HandleMode) -> Self {
        Self {
            mode,
            ..Self::default()
        }
    }

    pub fn from_json_str(json: &str) -> anyhow::Result<Self> {
        let config: GroupingConfig =
            serde_json::from_str(json).context("Failed to parse grouping configuration")?;
        if let Some(weights) = &config.variable_weights {
            if let Some((name, w)) = weights.0.iter().find(|(_, w)| !(**w >= 0.0)) {
                anyhow::bail!("Weight for variable '{}' must be non-negative, got {}", name, w);
            }
        }
        if config.part_weights.0.iter().any(|w| !(*w >= 0.0)) {
            anyhow::bail!(
                "Part weights must be non-negative, got {:?}",
                config.part_weights.0
            );
        }
        Ok(config)
    }
}

impl Default for GroupingConfig {
    fn default() -> Self {
        Self {
            mode: HandleMode::ToDissimilarity,
            variable_weights: None,
            part_weights: PartWeights::default(),
            connect_keyword: Self::DEFAULT_CONNECT_KEYWORD.to_string(),
        }
    }
}
