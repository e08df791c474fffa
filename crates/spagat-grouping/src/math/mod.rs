//! Array helpers used throughout the crate.
//!
//! `LabeledArray` is the named-axis input container for dataset variables;
//! `condensed` holds the index arithmetic for upper-triangle storage of
//! symmetric hollow matrices. Feature matrices themselves are plain
//! `ndarray` arrays.
pub mod condensed;
pub mod labeled;

pub use condensed::{
    condensed_index, condensed_len, condensed_pair, from_condensed, symmetrize_upper, to_condensed,
};
pub use labeled::LabeledArray;
