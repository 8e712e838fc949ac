//! Programs: ordered, never-empty instruction sequences
//!
//! A program owns its mutation operators ([`mutation`]) and knows how to run
//! itself on the register machine in either execution mode.

pub mod instruction;
pub mod mutation;

use rand::Rng;
use serde::{Deserialize, Serialize};

use tpg_common::{Observation, ProgramId, Result, TpgError};

use crate::machine::{scalar, vector, ExecutionMode, SharedBank, VectorFile};
pub use instruction::{Field, Instruction, InstructionRanges};
pub use mutation::{InstructionRates, ProgramMutation, UniquenessCorpus};

/// A learner's program
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Program {
    id: ProgramId,
    instructions: Vec<Instruction>,
}

impl Program {
    /// Build a program from explicit instructions
    pub fn new(id: ProgramId, instructions: Vec<Instruction>) -> Result<Self> {
        if instructions.is_empty() {
            return Err(TpgError::EmptyProgram);
        }
        Ok(Self { id, instructions })
    }

    /// Random program of `1..=max_length` random instructions
    pub fn random<R: Rng + ?Sized>(id: ProgramId, rng: &mut R, ranges: &InstructionRanges) -> Self {
        let len = rng.gen_range(1..=ranges.max_length.max(1));
        let instructions = (0..len).map(|_| Instruction::random(rng, ranges)).collect();
        Self { id, instructions }
    }

    /// Copy of this program's instructions under a new identity
    pub fn offspring(&self, id: ProgramId) -> Self {
        Self {
            id,
            instructions: self.instructions.clone(),
        }
    }

    pub fn id(&self) -> ProgramId {
        self.id
    }

    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    pub fn len(&self) -> usize {
        self.instructions.len()
    }

    /// Always false; a program holds at least one instruction
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// Run on a fresh register file of `registers` registers.
    ///
    /// Scalar mode sees the flattened observation; vector mode views it as a
    /// matrix whose rows fold all leading dimensions.
    pub fn execute(
        &self,
        mode: ExecutionMode,
        input: &Observation,
        registers: usize,
        shared: &mut SharedBank,
        share_group: usize,
    ) -> f64 {
        match mode {
            ExecutionMode::Scalar => {
                let mut regs = vec![0.0; registers.max(1)];
                scalar::execute(
                    input.values(),
                    &mut regs,
                    &self.instructions,
                    shared,
                    share_group,
                )
            }
            ExecutionMode::Vector => {
                let mut file = VectorFile::square(registers);
                vector::execute(
                    input.values(),
                    input.rows_cols(),
                    &mut file,
                    &self.instructions,
                    shared,
                    share_group,
                )
            }
        }
    }
}
