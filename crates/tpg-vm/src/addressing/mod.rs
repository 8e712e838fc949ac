//! Observation addressing strategies
//!
//! A strategy decides which part of an observation a learner's program sees:
//!
//! - [`Addressing::Full`]: the whole observation
//! - [`WindowAddressing`]: one `kernel^ndims` hypercube at a stored anchor
//! - [`MultiWindowAddressing`]: several windows gathered into one vector
//!
//! Windowed strategies cache the flat indices they gather. The cache is
//! rebuilt whenever an anchor moves and whenever a strategy is deserialized.

mod multi_window;
mod window;

use std::borrow::Cow;

use rand::Rng;
use serde::{Deserialize, Serialize};

use tpg_common::{AddressingKind, AddressingSettings, Observation};

pub use multi_window::MultiWindowAddressing;
pub use window::WindowAddressing;

/// Common behaviour of the addressing strategies
pub trait ObservationAddressing {
    /// Slice of `input` the program runs on
    fn address<'a>(&self, input: &'a Observation) -> Cow<'a, Observation>;

    /// Move the strategy's anchors; false if there is nothing to move
    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool;
}

/// A learner's addressing strategy and its parameters
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Addressing {
    #[default]
    Full,
    Window(WindowAddressing),
    MultiWindow(MultiWindowAddressing),
}

impl Addressing {
    /// New strategy of the configured kind with random anchors
    pub fn for_settings<R: Rng + ?Sized>(rng: &mut R, settings: &AddressingSettings) -> Self {
        match settings.kind {
            AddressingKind::Full => Addressing::Full,
            AddressingKind::Window => Addressing::Window(WindowAddressing::random(
                rng,
                &settings.source_dims,
                settings.kernel_size,
            )),
            AddressingKind::MultiWindow => {
                Addressing::MultiWindow(MultiWindowAddressing::random(
                    rng,
                    &settings.source_dims,
                    settings.kernel_size,
                    settings.kernel_points,
                    settings.step_size,
                ))
            }
        }
    }

    pub fn kind(&self) -> AddressingKind {
        match self {
            Addressing::Full => AddressingKind::Full,
            Addressing::Window(_) => AddressingKind::Window,
            Addressing::MultiWindow(_) => AddressingKind::MultiWindow,
        }
    }
}

impl ObservationAddressing for Addressing {
    fn address<'a>(&self, input: &'a Observation) -> Cow<'a, Observation> {
        match self {
            Addressing::Full => Cow::Borrowed(input),
            Addressing::Window(window) => window.address(input),
            Addressing::MultiWindow(multi) => multi.address(input),
        }
    }

    fn perturb<R: Rng + ?Sized>(&mut self, rng: &mut R) -> bool {
        match self {
            Addressing::Full => false,
            Addressing::Window(window) => window.perturb(rng),
            Addressing::MultiWindow(multi) => multi.perturb(rng),
        }
    }
}

/// Append the flat indices of the `kernel^ndims` window at `anchor`.
///
/// Coordinates wrap per axis, so every window has exactly `kernel^ndims`
/// points. Order is row-major with the last axis fastest.
pub(crate) fn expand_window(anchor: &[usize], dims: &[usize], kernel: usize, out: &mut Vec<usize>) {
    let ndims = anchor.len().min(dims.len());
    if ndims == 0 || kernel == 0 {
        return;
    }
    let mut offset = vec![0usize; ndims];
    let mut coords = vec![0usize; ndims];
    loop {
        for axis in 0..ndims {
            coords[axis] = anchor[axis] + offset[axis];
        }
        out.push(Observation::wrapped_index(&dims[..ndims], &coords));

        // Odometer step
        let mut axis = ndims;
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            offset[axis] += 1;
            if offset[axis] < kernel {
                break;
            }
            offset[axis] = 0;
        }
    }
}

/// Shift every coordinate of `anchor` by `shift`, wrapping into `dims`
pub(crate) fn shift_anchor(anchor: &mut [usize], shift: &[isize], dims: &[usize]) {
    for ((coord, &delta), &dim) in anchor.iter_mut().zip(shift).zip(dims) {
        let dim = dim.max(1) as isize;
        *coord = (*coord as isize + delta).rem_euclid(dim) as usize;
    }
}

/// Gather `indices` from `input` into a new observation of shape `dims`
pub(crate) fn gather<'a>(input: &'a Observation, indices: &[usize], dims: Vec<usize>) -> Cow<'a, Observation> {
    let values = input.values();
    if values.is_empty() {
        return Cow::Borrowed(input);
    }
    let gathered = indices.iter().map(|&i| values[i % values.len()]).collect();
    match Observation::new(gathered, dims) {
        Ok(obs) => Cow::Owned(obs),
        Err(_) => Cow::Borrowed(input),
    }
}
