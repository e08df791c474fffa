//! Region dataset container and variable classification.
//!
//! A `Dataset` holds the ordered region ids, the component (technology)
//! names and a list of named variables. `classify` sorts variables into the
//! three shapes the preprocessors understand and drops everything else.
use std::collections::BTreeMap;

use crate::error::{GroupingError, Result};
use crate::math::LabeledArray;

pub const COMPONENT_DIM: &str = "component";
pub const REGION_DIM: &str = "space";
pub const REGION_DIM_2: &str = "space_2";
pub const TIME_DIM: &str = "TimeStep";
pub const PERIOD_DIM: &str = "Period";

/// Shape category of a dataset variable.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VariableCategory {
    /// (component, space, TimeStep), optionally with a Period axis.
    TimeSeries,
    /// (component, space)
    Scalar,
    /// (component, space, space_2)
    Pairwise,
}

impl VariableCategory {
    pub fn of(array: &LabeledArray) -> Option<Self> {
        if array.has_dims(&[COMPONENT_DIM, PERIOD_DIM, REGION_DIM, TIME_DIM])
            || array.has_dims(&[COMPONENT_DIM, REGION_DIM, TIME_DIM])
        {
            Some(VariableCategory::TimeSeries)
        } else if array.has_dims(&[COMPONENT_DIM, REGION_DIM]) {
            Some(VariableCategory::Scalar)
        } else if array.has_dims(&[COMPONENT_DIM, REGION_DIM, REGION_DIM_2]) {
            Some(VariableCategory::Pairwise)
        } else {
            None
        }
    }

    /// Axis order the preprocessors index into.
    fn canonical_dims(&self) -> &'static [&'static str] {
        match self {
            VariableCategory::TimeSeries => &[COMPONENT_DIM, REGION_DIM, TIME_DIM],
            VariableCategory::Scalar => &[COMPONENT_DIM, REGION_DIM],
            VariableCategory::Pairwise => &[COMPONENT_DIM, REGION_DIM, REGION_DIM_2],
        }
    }
}

#[derive(Debug, Clone)]
pub struct Dataset {
    regions: Vec<String>,
    components: Vec<String>,
    variables: Vec<(String, LabeledArray)>,
}

impl Dataset {
    pub fn new<R, C>(regions: Vec<R>, components: Vec<C>) -> Self
    where
        R: Into<String>,
        C: Into<String>,
    {
        Dataset {
            regions: regions.into_iter().map(Into::into).collect(),
            components: components.into_iter().map(Into::into).collect(),
            variables: Vec::new(),
        }
    }

    /// Add a variable, checking the lengths of every known axis against the
    /// dataset. Region axes without coordinates get the dataset's region ids.
    pub fn add_variable(&mut self, name: impl Into<String>, mut array: LabeledArray) -> Result<()> {
        let name = name.into();
        if array.has_dim(COMPONENT_DIM) {
            self.check_len(&name, &array, COMPONENT_DIM, self.components.len())?;
        }
        for dim in [REGION_DIM, REGION_DIM_2] {
            if !array.has_dim(dim) {
                continue;
            }
            self.check_len(&name, &array, dim, self.regions.len())?;
            if array.coords(dim).is_none() {
                array = array.with_coords(dim, self.regions.clone())?;
                continue;
            }
            // The second region axis may be permuted; the first must follow the dataset.
            if dim == REGION_DIM_2 {
                continue;
            }
            let mismatch = array.coords(dim).and_then(|labels| {
                labels
                    .iter()
                    .zip(self.regions.iter())
                    .find(|(a, b)| a != b)
                    .map(|(a, _)| a.clone())
            });
            if let Some(label) = mismatch {
                return Err(GroupingError::RegionLabelMismatch {
                    variable: name,
                    label,
                });
            }
        }
        self.variables.retain(|(n, _)| *n != name);
        self.variables.push((name, array));
        Ok(())
    }

    pub fn with_variable(mut self, name: impl Into<String>, array: LabeledArray) -> Result<Self> {
        self.add_variable(name, array)?;
        Ok(self)
    }

    fn check_len(&self, name: &str, array: &LabeledArray, dim: &str, expected: usize) -> Result<()> {
        let found = array.len_of(dim)?;
        if found != expected {
            return Err(GroupingError::ShapeMismatch {
                context: format!("axis '{}' of variable '{}'", dim, name),
                expected: vec![expected],
                found: vec![found],
            });
        }
        Ok(())
    }

    pub fn regions(&self) -> &[String] {
        &self.regions
    }

    pub fn components(&self) -> &[String] {
        &self.components
    }

    pub fn n_regions(&self) -> usize {
        self.regions.len()
    }

    pub fn n_components(&self) -> usize {
        self.components.len()
    }

    pub fn variables(&self) -> impl Iterator<Item = (&str, &LabeledArray)> {
        self.variables.iter().map(|(n, a)| (n.as_str(), a))
    }

    pub fn variable(&self, name: &str) -> Option<&LabeledArray> {
        self.variables
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, a)| a)
    }

    pub fn region_index(&self, id: &str) -> Result<usize> {
        self.regions
            .iter()
            .position(|r| r == id)
            .ok_or_else(|| GroupingError::UnknownRegion(id.to_string()))
    }

    pub fn classify(&self) -> Result<ClassifiedVariables> {
        classify(self.variables())
    }
}

/// Variables sorted by shape, each transposed to its category's canonical
/// axis order (component first).
#[derive(Debug, Clone, Default)]
pub struct ClassifiedVariables {
    pub time_series: BTreeMap<String, LabeledArray>,
    pub scalar: BTreeMap<String, LabeledArray>,
    pub pairwise: BTreeMap<String, LabeledArray>,
}

impl ClassifiedVariables {
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.time_series
            .keys()
            .chain(self.scalar.keys())
            .chain(self.pairwise.keys())
            .map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.time_series.is_empty() && self.scalar.is_empty() && self.pairwise.is_empty()
    }
}

/// Sort variables into time-series, scalar and pairwise categories.
///
/// A time-series variable carrying a `Period` axis is reduced to its first
/// period. Variables of any other shape are dropped with a warning.
pub fn classify<'a, I>(variables: I) -> Result<ClassifiedVariables>
where
    I: IntoIterator<Item = (&'a str, &'a LabeledArray)>,
{
    let mut classified = ClassifiedVariables::default();

    for (name, array) in variables {
        let Some(category) = VariableCategory::of(array) else {
            log::warn!(
                "Variable {} has dimensions {:?} which are not considered for spatial aggregation.",
                name,
                array.dims()
            );
            continue;
        };

        let array = if category == VariableCategory::TimeSeries && array.has_dim(PERIOD_DIM) {
            array.index_axis(PERIOD_DIM, 0)?
        } else {
            array.clone()
        };
        let array = array.transpose(category.canonical_dims())?;

        let target = match category {
            VariableCategory::TimeSeries => &mut classified.time_series,
            VariableCategory::Scalar => &mut classified.scalar,
            VariableCategory::Pairwise => &mut classified.pairwise,
        };
        target.insert(name.to_string(), array);
    }

    log::debug!(
        "Classified variables: {} time-series, {} scalar, {} pairwise",
        classified.time_series.len(),
        classified.scalar.len(),
        classified.pairwise.len()
    );

    Ok(classified)
}

/// Indices of the components whose mean over every other axis is defined,
/// in ascending order. Components with no present value at all are invalid.
pub fn valid_components(array: &LabeledArray, n_components: usize) -> Result<Vec<usize>> {
    let found = array.len_of(COMPONENT_DIM)?;
    if found != n_components {
        return Err(GroupingError::ShapeMismatch {
            context: "component axis".to_string(),
            expected: vec![n_components],
            found: vec![found],
        });
    }
    let others: Vec<&str> = array
        .dims()
        .iter()
        .map(String::as_str)
        .filter(|d| *d != COMPONENT_DIM)
        .collect();
    let means = array.nanmean_over(&others)?.to_array1()?;

    let valid: Vec<usize> = means
        .iter()
        .enumerate()
        .filter(|(_, m)| !m.is_nan())
        .map(|(c, _)| c)
        .collect();
    if valid.len() < n_components {
        log::warn!(
            "{} of {} components have no values and are skipped",
            n_components - valid.len(),
            n_components
        );
    }
    Ok(valid)
}
