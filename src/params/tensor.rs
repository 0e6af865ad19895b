use ndarray::{ArrayView1, ArrayView2};
use serde::{Deserialize, Serialize};

use super::{ParamsErr, Result};

/// A dense row-major buffer of `f32` values together with its shape.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    shape: Vec<usize>,
    values: Vec<f32>,
}

impl Tensor {
    /// Creates a new `Tensor`.
    ///
    /// # Arguments
    /// * `shape` - The dimensions of the tensor.
    /// * `values` - The flat row-major values.
    ///
    /// # Returns
    /// A new tensor or `ParamsErr::InvalidShape` if the shape doesn't cover exactly `values`.
    pub fn new(shape: Vec<usize>, values: Vec<f32>) -> Result<Self> {
        if shape.iter().product::<usize>() != values.len() {
            return Err(ParamsErr::InvalidShape {
                shape,
                len: values.len(),
            });
        }

        Ok(Self { shape, values })
    }

    /// Creates a tensor filled with zeros.
    pub fn zeros(shape: Vec<usize>) -> Self {
        let len = shape.iter().product();
        Self {
            shape,
            values: vec![0.; len],
        }
    }

    /// Creates a single value tensor of shape `[1]`.
    pub fn scalar(value: f32) -> Self {
        Self {
            shape: vec![1],
            values: vec![value],
        }
    }

    pub fn shape(&self) -> &[usize] {
        &self.shape
    }

    pub fn values(&self) -> &[f32] {
        &self.values
    }

    pub fn values_mut(&mut self) -> &mut [f32] {
        &mut self.values
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Views the tensor as a matrix, a 1-D tensor is seen as a single row.
    ///
    /// # Returns
    /// The view or `ParamsErr::InvalidShape` if the tensor has more than two dimensions.
    pub fn view2(&self) -> Result<ArrayView2<'_, f32>> {
        let dim = self.dim2()?;
        ArrayView2::from_shape(dim, &self.values).map_err(|_| self.invalid_shape())
    }

    /// Views the tensor as a flat vector.
    pub fn view1(&self) -> ArrayView1<'_, f32> {
        ArrayView1::from(&self.values[..])
    }

    fn dim2(&self) -> Result<(usize, usize)> {
        match *self.shape.as_slice() {
            [n] => Ok((1, n)),
            [n, m] => Ok((n, m)),
            _ => Err(self.invalid_shape()),
        }
    }

    fn invalid_shape(&self) -> ParamsErr {
        ParamsErr::InvalidShape {
            shape: self.shape.clone(),
            len: self.values.len(),
        }
    }
}
