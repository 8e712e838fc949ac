//! # TPG VM
//!
//! Register machine that turns a learner's program into a bid.
//!
//! ## Instruction Format
//!
//! ```text
//! [MODE][OP][DEST_SHARED][DEST][SRC_SHARED][SRC]
//! ```
//!
//! Indices are reduced modulo the live register file, shared bank, or input
//! at execution time, so every instruction is valid for every machine.
//!
//! ## Execution Modes
//!
//! - Scalar: registers are numbers, the source is one register, bank slot,
//!   or input element
//! - Vector: registers are vectors, the source is a register or a row/column
//!   slice of the input viewed as a matrix
//!
//! Every write is normalized: NaN becomes 0 and infinities clamp to the
//! largest finite values.
//!
//! ## Addressing
//!
//! [`Addressing`] picks the part of an observation a program sees: all of
//! it, one window, or several windows gathered together.

pub mod addressing;
pub mod machine;
pub mod program;
pub mod rng;

pub use addressing::{Addressing, MultiWindowAddressing, ObservationAddressing, WindowAddressing};
pub use machine::{normalize, ExecutionMode, SharedBank, SourceDecoder, VectorFile};
pub use program::{
    Field, Instruction, InstructionRanges, InstructionRates, Program, ProgramMutation,
    UniquenessCorpus,
};
