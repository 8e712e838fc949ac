//! Single-window addressing

use std::borrow::Cow;

use rand::Rng;
use serde::{Deserialize, Serialize};

use tpg_common::Observation;

use super::{expand_window, gather, shift_anchor, ObservationAddressing};
use crate::rng::nonzero_shift;

/// One `kernel^ndims` window anchored at its lowest corner.
///
/// The program sees an observation of shape `[kernel; ndims]`. Mutation moves
/// the anchor by -1, 0 or +1 per axis, never by zero on every axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "WindowParams", into = "WindowParams")]
pub struct WindowAddressing {
    anchor: Vec<usize>,
    dims: Vec<usize>,
    kernel: usize,
    gather: Vec<usize>,
}

#[derive(Clone, Serialize, Deserialize)]
struct WindowParams {
    anchor: Vec<usize>,
    dims: Vec<usize>,
    kernel: usize,
}

impl From<WindowParams> for WindowAddressing {
    fn from(p: WindowParams) -> Self {
        Self::new(p.anchor, p.dims, p.kernel)
    }
}

impl From<WindowAddressing> for WindowParams {
    fn from(w: WindowAddressing) -> Self {
        Self {
            anchor: w.anchor,
            dims: w.dims,
            kernel: w.kernel,
        }
    }
}

impl WindowAddressing {
    /// Window at `anchor` over observations of shape `dims`
    pub fn new(anchor: Vec<usize>, dims: Vec<usize>, kernel: usize) -> Self {
        let mut window = Self {
            anchor,
            dims,
            kernel: kernel.max(1),
            gather: Vec::new(),
        };
        window.rebuild();
        window
    }

    /// Anchor drawn so the window starts clear of the far edge
    pub fn random<R: Rng + ?Sized>(rng: &mut R, dims: &[usize], kernel: usize) -> Self {
        let anchor = dims
            .iter()
            .map(|&dim| rng.gen_range(0..=dim.saturating_sub(kernel + 1)))
            .collect();
        Self::new(anchor, dims.to_vec(), kernel)
    }

    pub fn anchor(&self) -> &[usize] {
        &self.anchor
    }

    pub fn kernel(&self) -> usize {
        self.kernel
    }

    /// Flat indices gathered from a `dims`-shaped observation
    pub fn indices(&self) -> &[usize] {
        &self.gather
    }

    fn rebuild(&mut self) {
        self.gather.clear();
        expand_window(&self.anchor, &self.dims, self.kernel, &mut self.gather);
    }
}

impl ObservationAddressing for WindowAddressing {
    fn address<'a>(&self, input: &'a Observation) -> Cow<'a, Observation> {
        if input.dims().len() != self.anchor.len() {
            return Cow::Borrowed(input);
        }
        let shape = vec![self.kernel; self.anchor.len()];
        if input.dims() == self.dims.as_slice() {
            gather(input, &self.gather, shape)
        } else {
            let mut indices = Vec::with_capacity(self.gather.len());
            expand_window(&self.anchor, input.dims(), self.kernel, &mut indices);
            gather(input, &indices, shape)
        }
    }

    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        if self.anchor.is_empty() {
            return false;
        }
        let shift = nonzero_shift(rng, self.anchor.len(), 1);
        shift_anchor(&mut self.anchor, &shift, &self.dims);
        self.rebuild();
        true
    }
}
