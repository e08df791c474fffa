use ndarray::{Array1, Array2, ArrayD, Axis, Ix1, Ix2, IxDyn};

use crate::error::{GroupingError, Result};

/// An n-dimensional `f64` array whose axes carry names and, optionally,
/// coordinate labels. Missing values are `NaN`.
///
/// Only what the preprocessors need is exposed: shape introspection,
/// NaN-skipping mean over named axes, transposition by name and positional
/// slicing along a named axis.
#[derive(Clone, Debug, PartialEq)]
pub struct LabeledArray {
    dims: Vec<String>,
    coords: Vec<Option<Vec<String>>>,
    data: ArrayD<f64>,
}

impl LabeledArray {
    pub fn new<S: Into<String>>(dims: Vec<S>, data: ArrayD<f64>) -> Result<Self> {
        let dims: Vec<String> = dims.into_iter().map(Into::into).collect();
        if dims.len() != data.ndim() {
            return Err(GroupingError::ShapeMismatch {
                context: "dimension labels".to_string(),
                expected: vec![data.ndim()],
                found: vec![dims.len()],
            });
        }
        for (i, d) in dims.iter().enumerate() {
            if dims[..i].contains(d) {
                return Err(GroupingError::DuplicateDimension(d.clone()));
            }
        }
        let coords = vec![None; dims.len()];
        Ok(Self { dims, coords, data })
    }

    pub fn from_shape_vec<S: Into<String>>(
        dims: Vec<S>,
        shape: &[usize],
        values: Vec<f64>,
    ) -> Result<Self> {
        let data = ArrayD::from_shape_vec(IxDyn(shape), values)?;
        Self::new(dims, data)
    }

    /// Attach coordinate labels to one axis.
    pub fn with_coords<S: Into<String>>(mut self, dim: &str, labels: Vec<S>) -> Result<Self> {
        let axis = self.axis(dim)?;
        let labels: Vec<String> = labels.into_iter().map(Into::into).collect();
        if labels.len() != self.data.len_of(Axis(axis)) {
            return Err(GroupingError::ShapeMismatch {
                context: format!("coordinates of '{}'", dim),
                expected: vec![self.data.len_of(Axis(axis))],
                found: vec![labels.len()],
            });
        }
        self.coords[axis] = Some(labels);
        Ok(self)
    }

    pub fn dims(&self) -> &[String] {
        &self.dims
    }

    pub fn shape(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn has_dim(&self, dim: &str) -> bool {
        self.dims.iter().any(|d| d == dim)
    }

    /// True when the axis names equal `expected`, ignoring order.
    pub fn has_dims(&self, expected: &[&str]) -> bool {
        let mut own: Vec<&str> = self.dims.iter().map(String::as_str).collect();
        let mut other = expected.to_vec();
        own.sort_unstable();
        other.sort_unstable();
        own == other
    }

    pub fn axis(&self, dim: &str) -> Result<usize> {
        self.dims
            .iter()
            .position(|d| d == dim)
            .ok_or_else(|| GroupingError::UnknownDimension(dim.to_string()))
    }

    pub fn len_of(&self, dim: &str) -> Result<usize> {
        Ok(self.data.len_of(Axis(self.axis(dim)?)))
    }

    pub fn coords(&self, dim: &str) -> Option<&[String]> {
        let axis = self.axis(dim).ok()?;
        self.coords[axis].as_deref()
    }

    /// Reorder the axes to `order`, which must name every axis exactly once.
    pub fn transpose(&self, order: &[&str]) -> Result<Self> {
        if order.len() != self.ndim() || !self.has_dims(order) {
            return Err(GroupingError::ShapeMismatch {
                context: format!("transpose of {:?} to {:?}", self.dims, order),
                expected: vec![self.ndim()],
                found: vec![order.len()],
            });
        }
        let axes = order
            .iter()
            .map(|d| self.axis(d))
            .collect::<Result<Vec<usize>>>()?;
        let data = self
            .data
            .view()
            .permuted_axes(axes.clone())
            .as_standard_layout()
            .into_owned();
        Ok(Self {
            dims: order.iter().map(|d| d.to_string()).collect(),
            coords: axes.iter().map(|&a| self.coords[a].clone()).collect(),
            data,
        })
    }

    /// Positional slice along `dim`; the axis is removed from the result.
    pub fn index_axis(&self, dim: &str, index: usize) -> Result<Self> {
        let axis = self.axis(dim)?;
        let len = self.data.len_of(Axis(axis));
        if index >= len {
            return Err(GroupingError::ShapeMismatch {
                context: format!("index {} along '{}'", index, dim),
                expected: vec![len],
                found: vec![index + 1],
            });
        }
        let data = self
            .data
            .index_axis(Axis(axis), index)
            .as_standard_layout()
            .into_owned();
        let mut dims = self.dims.clone();
        let mut coords = self.coords.clone();
        dims.remove(axis);
        coords.remove(axis);
        Ok(Self { dims, coords, data })
    }

    /// Mean over the named axes, skipping missing values. A lane with no
    /// present value reduces to `NaN`.
    pub fn nanmean_over(&self, reduce: &[&str]) -> Result<Self> {
        for d in reduce {
            self.axis(d)?;
        }
        let keep: Vec<&str> = self
            .dims
            .iter()
            .map(String::as_str)
            .filter(|d| !reduce.contains(d))
            .collect();
        let order: Vec<&str> = keep.iter().chain(reduce.iter()).copied().collect();
        let permuted = self.transpose(&order)?;

        let keep_shape = permuted.shape()[..keep.len()].to_vec();
        let keep_size: usize = keep_shape.iter().product();
        let reduce_size: usize = permuted.shape()[keep.len()..].iter().product();

        let lanes = permuted.data.into_shape((keep_size, reduce_size))?;
        let means: Vec<f64> = lanes
            .axis_iter(Axis(0))
            .map(|lane| nanmean(lane.iter()))
            .collect();

        Ok(Self {
            dims: keep.iter().map(|d| d.to_string()).collect(),
            coords: permuted.coords[..keep.len()].to_vec(),
            data: ArrayD::from_shape_vec(IxDyn(&keep_shape), means)?,
        })
    }

    pub fn to_array1(&self) -> Result<Array1<f64>> {
        Ok(self.data.clone().into_dimensionality::<Ix1>()?)
    }

    pub fn to_array2(&self) -> Result<Array2<f64>> {
        Ok(self.data.clone().into_dimensionality::<Ix2>()?)
    }
}

pub(crate) fn nanmean<'a, I>(values: I) -> f64
where
    I: IntoIterator<Item = &'a f64>,
{
    let (sum, count) = values
        .into_iter()
        .filter(|v| !v.is_nan())
        .fold((0.0, 0usize), |(s, c), v| (s + v, c + 1));
    if count == 0 {
        f64::NAN
    } else {
        sum / count as f64
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cube() -> LabeledArray {
        // component: 2, space: 3, TimeStep: 2
        LabeledArray::from_shape_vec(
            vec!["component", "space", "TimeStep"],
            &[2, 3, 2],
            vec![
                1.0, 2.0, 3.0, 4.0, 5.0, 6.0, //
                f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN, f64::NAN,
            ],
        )
        .unwrap()
    }

    #[test]
    fn nanmean_over_keeps_named_axis() {
        let means = cube().nanmean_over(&["space", "TimeStep"]).unwrap();
        assert_eq!(means.dims(), &["component".to_string()]);
        let v = means.to_array1().unwrap();
        assert!((v[0] - 3.5).abs() < 1e-12);
        assert!(v[1].is_nan());
    }

    #[test]
    fn transpose_moves_coords_with_axes() {
        let a = cube()
            .with_coords("space", vec!["a", "b", "c"])
            .unwrap()
            .transpose(&["space", "TimeStep", "component"])
            .unwrap();
        assert_eq!(a.shape(), &[3, 2, 2]);
        assert_eq!(a.coords("space").unwrap(), &["a", "b", "c"]);
        assert_eq!(a.data()[[1, 0, 0]], 3.0);
    }

    #[test]
    fn duplicate_dims_rejected() {
        let r = LabeledArray::from_shape_vec(vec!["space", "space"], &[1, 1], vec![0.0]);
        assert!(matches!(r, Err(GroupingError::DuplicateDimension(_))));
    }
}
