//! Register machine
//!
//! Interprets a program once per decision. Two interpretations exist:
//!
//! - [`scalar`]: registers are scalars, the source is a register, a shared
//!   slot, or one input element
//! - [`vector`]: registers are vectors, the source is a vector register or a
//!   row/column slice of a 2-D input; writes to the shared bank reduce to a
//!   scalar
//!
//! Both are total: modular addressing keeps every index in range and every
//! write is normalized, so no instruction sequence can fault or leave a
//! non-finite value behind.

pub mod scalar;
pub mod shared;
pub mod vector;

use serde::{Deserialize, Serialize};

pub use shared::SharedBank;
pub use vector::{SourceDecoder, VectorFile};

/// How a learner's program is interpreted
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionMode {
    #[default]
    Scalar,
    Vector,
}

impl ExecutionMode {
    /// The other mode
    pub fn toggled(self) -> Self {
        match self {
            ExecutionMode::Scalar => ExecutionMode::Vector,
            ExecutionMode::Vector => ExecutionMode::Scalar,
        }
    }
}

/// Replace NaN with 0 and clamp infinities to the largest finite values
#[inline]
pub fn normalize(value: f64) -> f64 {
    if value.is_nan() {
        0.0
    } else if value == f64::INFINITY {
        f64::MAX
    } else if value == f64::NEG_INFINITY {
        f64::MIN
    } else {
        value
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(f64::NAN), 0.0);
        assert_eq!(normalize(f64::INFINITY), f64::MAX);
        assert_eq!(normalize(f64::NEG_INFINITY), f64::MIN);
        assert_eq!(normalize(-2.5), -2.5);
    }

    #[test]
    fn test_toggle() {
        assert_eq!(ExecutionMode::Scalar.toggled(), ExecutionMode::Vector);
        assert_eq!(ExecutionMode::Vector.toggled().toggled(), ExecutionMode::Vector);
    }
}
