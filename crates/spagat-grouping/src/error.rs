use std::error::Error;
use std::fmt;

/// Errors raised while preprocessing region data or scoring a grouping.
#[derive(Debug)]
pub enum GroupingError {
    /// An explicit weight mapping was supplied but does not name this variable.
    MissingWeight(String),
    /// Modularity is undefined for a graph without edges or with missing weights.
    ZeroEdgeWeight,
    ShapeMismatch {
        context: String,
        expected: Vec<usize>,
        found: Vec<usize>,
    },
    UnknownDimension(String),
    DuplicateDimension(String),
    /// Region labels of the two axes of a pairwise variable do not match.
    RegionLabelMismatch { variable: String, label: String },
    RegionOutOfRange { index: usize, n_regions: usize },
    UnknownRegion(String),
    InvalidHierarchy(String),
    InvalidLabels(String),
    InvalidMode(String),
    Array(ndarray::ShapeError),
}

impl fmt::Display for GroupingError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            GroupingError::MissingWeight(name) => {
                write!(f, "No weight given for variable '{}'", name)
            }
            GroupingError::ZeroEdgeWeight => {
                write!(
                    f,
                    "Modularity is undefined: adjacency total edge weight is zero or not finite"
                )
            }
            GroupingError::ShapeMismatch {
                context,
                expected,
                found,
            } => write!(
                f,
                "Shape mismatch in {}: expected {:?}, found {:?}",
                context, expected, found
            ),
            GroupingError::UnknownDimension(name) => write!(f, "Unknown dimension '{}'", name),
            GroupingError::DuplicateDimension(name) => {
                write!(f, "Dimension '{}' appears more than once", name)
            }
            GroupingError::RegionLabelMismatch { variable, label } => write!(
                f,
                "Region '{}' of the second region axis of '{}' is missing from the first axis",
                label, variable
            ),
            GroupingError::RegionOutOfRange { index, n_regions } => write!(
                f,
                "Region index {} out of range for {} regions",
                index, n_regions
            ),
            GroupingError::UnknownRegion(id) => write!(f, "Unknown region '{}'", id),
            GroupingError::InvalidHierarchy(msg) => write!(f, "Invalid aggregation hierarchy: {}", msg),
            GroupingError::InvalidLabels(msg) => write!(f, "Invalid cluster labels: {}", msg),
            GroupingError::InvalidMode(s) => write!(
                f,
                "Unknown handle mode: {}. Expected 'toDissimilarity' or 'toAffinity'",
                s
            ),
            GroupingError::Array(err) => write!(f, "Array error: {}", err),
        }
    }
}

impl Error for GroupingError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            GroupingError::Array(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ndarray::ShapeError> for GroupingError {
    fn from(err: ndarray::ShapeError) -> Self {
        GroupingError::Array(err)
    }
}

pub type Result<T> = std::result::Result<T, GroupingError>;
