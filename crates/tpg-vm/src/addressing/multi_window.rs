//! Multi-window addressing

use std::borrow::Cow;

use rand::Rng;
use serde::{Deserialize, Serialize};

use tpg_common::Observation;

use super::{expand_window, gather, shift_anchor, ObservationAddressing};
use crate::rng::nonzero_shift;

/// K windows whose points are concatenated into one flat vector.
///
/// Each mutation moves every anchor independently by up to `step` per axis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(from = "MultiWindowParams", into = "MultiWindowParams")]
pub struct MultiWindowAddressing {
    anchors: Vec<Vec<usize>>,
    dims: Vec<usize>,
    kernel: usize,
    step: usize,
    gather: Vec<usize>,
}

#[derive(Clone, Serialize, Deserialize)]
struct MultiWindowParams {
    anchors: Vec<Vec<usize>>,
    dims: Vec<usize>,
    kernel: usize,
    step: usize,
}

impl From<MultiWindowParams> for MultiWindowAddressing {
    fn from(p: MultiWindowParams) -> Self {
        Self::new(p.anchors, p.dims, p.kernel, p.step)
    }
}

impl From<MultiWindowAddressing> for MultiWindowParams {
    fn from(m: MultiWindowAddressing) -> Self {
        Self {
            anchors: m.anchors,
            dims: m.dims,
            kernel: m.kernel,
            step: m.step,
        }
    }
}

impl MultiWindowAddressing {
    pub fn new(anchors: Vec<Vec<usize>>, dims: Vec<usize>, kernel: usize, step: usize) -> Self {
        let mut multi = Self {
            anchors,
            dims,
            kernel: kernel.max(1),
            step: step.max(1),
            gather: Vec::new(),
        };
        multi.rebuild();
        multi
    }

    pub fn random<R: Rng + ?Sized>(
        rng: &mut R,
        dims: &[usize],
        kernel: usize,
        points: usize,
        step: usize,
    ) -> Self {
        let anchors = (0..points)
            .map(|_| {
                dims.iter()
                    .map(|&dim| rng.gen_range(0..dim.saturating_sub(kernel).max(1)))
                    .collect()
            })
            .collect();
        Self::new(anchors, dims.to_vec(), kernel, step)
    }

    pub fn anchors(&self) -> &[Vec<usize>] {
        &self.anchors
    }

    pub fn indices(&self) -> &[usize] {
        &self.gather
    }

    fn rebuild(&mut self) {
        self.gather.clear();
        for anchor in &self.anchors {
            expand_window(anchor, &self.dims, self.kernel, &mut self.gather);
        }
    }
}

impl ObservationAddressing for MultiWindowAddressing {
    fn address<'a>(&self, input: &'a Observation) -> Cow<'a, Observation> {
        if input.dims() == self.dims.as_slice() {
            return gather(input, &self.gather, vec![self.gather.len()]);
        }
        let mut indices = Vec::with_capacity(self.gather.len());
        for anchor in &self.anchors {
            if anchor.len() != input.dims().len() {
                return Cow::Borrowed(input);
            }
            expand_window(anchor, input.dims(), self.kernel, &mut indices);
        }
        let len = indices.len();
        gather(input, &indices, vec![len])
    }

    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        let mut moved = false;
        for anchor in &mut self.anchors {
            if anchor.is_empty() {
                continue;
            }
            let shift = nonzero_shift(rng, anchor.len(), self.step);
            shift_anchor(anchor, &shift, &self.dims);
            moved = true;
        }
        if moved {
            self.rebuild();
        }
        moved
    }
}
