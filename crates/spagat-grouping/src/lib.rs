//! spagat-grouping: region dissimilarity and grouping-quality scoring for
//! spatial aggregation of energy system models.
//!
//! A `Dataset` of time-series, scalar and pairwise (region × region)
//! variables is classified, scaled and either kept per variable for the
//! custom region `distance` or fused into weighted affinity matrices. The
//! resulting distance matrix feeds an external hierarchical clustering
//! routine; its hierarchy comes back here to be scored with `modularity`
//! over the region `connectivity` graph and with silhouette coefficients.
pub mod config;
pub mod dataset;
pub mod distance;
pub mod error;
pub mod features;
pub mod graph;
pub mod math;
pub mod pipeline;
pub mod preprocessing;
pub mod stats;

pub use config::{GroupingConfig, HandleMode, PartWeights, VariableWeights};
pub use dataset::{classify, valid_components, ClassifiedVariables, Dataset, VariableCategory};
pub use distance::{
    condensed_distance_vector, distance, distance_matrix, distance_matrix_with_config,
    distance_matrix_with_parts,
};
pub use error::{GroupingError, Result};
pub use graph::{
    check_connectivity, connectivity, connectivity_with_config, connectivity_with_keyword,
};
pub use math::LabeledArray;
pub use pipeline::{preprocess_dataset, preprocess_with_config, AffinityInput, DissimilarityInput, Preprocessed};
pub use stats::{modularity, modularity_series, silhouette_score, silhouette_series, AggregationHierarchy};
