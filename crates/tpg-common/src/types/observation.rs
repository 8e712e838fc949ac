//! Observation - the fixed-shape numeric input a learner bids on
//!
//! Values are stored flattened in row-major order alongside their shape.
//! An observation is never empty, which lets the register machine reduce
//! input indices modulo its length without a guard.

use serde::{Deserialize, Serialize};

use crate::error::{Result, TpgError};

/// Row-major numeric input with an explicit shape
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "ObservationParts")]
pub struct Observation {
    values: Vec<f64>,
    dims: Vec<usize>,
}

/// Unchecked wire form; becomes an [`Observation`] only through [`Observation::new`]
#[derive(Deserialize)]
struct ObservationParts {
    values: Vec<f64>,
    dims: Vec<usize>,
}

impl TryFrom<ObservationParts> for Observation {
    type Error = TpgError;

    fn try_from(parts: ObservationParts) -> Result<Self> {
        Observation::new(parts.values, parts.dims)
    }
}

impl Observation {
    /// Create an observation, checking that `dims` describes `values`
    pub fn new(values: Vec<f64>, dims: Vec<usize>) -> Result<Self> {
        if values.is_empty() {
            return Err(TpgError::InvalidObservation("no values".to_string()));
        }
        if dims.is_empty() || dims.contains(&0) {
            return Err(TpgError::InvalidObservation(format!(
                "invalid shape {:?}",
                dims
            )));
        }
        let expected: usize = dims.iter().product();
        if expected != values.len() {
            return Err(TpgError::InvalidObservation(format!(
                "shape {:?} holds {} values, got {}",
                dims,
                expected,
                values.len()
            )));
        }
        Ok(Self { values, dims })
    }

    /// One-dimensional observation
    pub fn flat(values: Vec<f64>) -> Result<Self> {
        let len = values.len();
        Self::new(values, vec![len])
    }

    pub fn values(&self) -> &[f64] {
        &self.values
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Always false; kept for clippy's `len_without_is_empty`
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// View as a 2-D matrix: all leading dimensions fold into rows
    pub fn rows_cols(&self) -> (usize, usize) {
        let cols = self.dims[self.dims.len() - 1];
        (self.values.len() / cols, cols)
    }

    /// Row-major flat index of a coordinate, each axis wrapped to its size
    pub fn wrapped_index(dims: &[usize], coords: &[usize]) -> usize {
        dims.iter()
            .zip(coords)
            .fold(0, |acc, (&dim, &c)| acc * dim + c % dim)
    }
}
