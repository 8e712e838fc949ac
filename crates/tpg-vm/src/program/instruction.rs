//! Instruction - fixed 6-field instruction format
//!
//! ## Format
//!
//! ```text
//! [MODE][OP][DEST_SHARED][DEST][SRC_SHARED][SRC]
//!   ↓     ↓       ↓         ↓        ↓        ↓
//! source opcode  dest in   dest    source   source
//!  kind          bank?    index    in bank? index
//! ```
//!
//! Every field is a raw unsigned integer. Nothing is bounds-checked when an
//! instruction is built or mutated: flags are read as "non-zero", opcodes are
//! reduced modulo [`OPERATION_COUNT`], and indices are reduced modulo the live
//! register file, bank, or input size when the instruction executes. Any
//! instruction is therefore valid for any register file of size >= 1.

use rand::Rng;
use serde::{Deserialize, Serialize};
use std::fmt;

use tpg_common::{ProgramSettings, OPERATION_COUNT};

/// A register machine instruction
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "[u32; 6]", into = "[u32; 6]")]
pub struct Instruction {
    /// 0 reads a register or bank slot, non-zero reads the input
    pub mode: u32,
    /// Operation code
    pub op: u32,
    /// Non-zero writes into the shared bank
    pub dest_shared: u32,
    /// Destination index
    pub dest: u32,
    /// Non-zero reads the shared bank (vector mode: column slice)
    pub src_shared: u32,
    /// Source index
    pub src: u32,
}

impl Instruction {
    /// Number of fields
    pub const FIELD_COUNT: usize = 6;

    pub const fn new(
        mode: u32,
        op: u32,
        dest_shared: u32,
        dest: u32,
        src_shared: u32,
        src: u32,
    ) -> Self {
        Self {
            mode,
            op,
            dest_shared,
            dest,
            src_shared,
            src,
        }
    }

    /// Sample every field uniformly within its range
    pub fn random<R: Rng + ?Sized>(rng: &mut R, ranges: &InstructionRanges) -> Self {
        let mut fields = [0u32; Self::FIELD_COUNT];
        for field in Field::ALL {
            fields[field.index()] = rng.gen_range(0..field.range(ranges).max(1));
        }
        Self::from(fields)
    }

    #[inline]
    pub fn reads_input(&self) -> bool {
        self.mode != 0
    }

    #[inline]
    pub fn reads_shared(&self) -> bool {
        self.src_shared != 0
    }

    #[inline]
    pub fn writes_shared(&self) -> bool {
        self.dest_shared != 0
    }

    #[inline]
    pub fn opcode(&self) -> u32 {
        self.op % OPERATION_COUNT
    }

    pub fn get(&self, field: Field) -> u32 {
        match field {
            Field::Mode => self.mode,
            Field::Operation => self.op,
            Field::DestShared => self.dest_shared,
            Field::Destination => self.dest,
            Field::SourceShared => self.src_shared,
            Field::Source => self.src,
        }
    }

    pub fn set(&mut self, field: Field, value: u32) {
        match field {
            Field::Mode => self.mode = value,
            Field::Operation => self.op = value,
            Field::DestShared => self.dest_shared = value,
            Field::Destination => self.dest = value,
            Field::SourceShared => self.src_shared = value,
            Field::Source => self.src = value,
        }
    }
}

impl From<[u32; 6]> for Instruction {
    fn from(f: [u32; 6]) -> Self {
        Self::new(f[0], f[1], f[2], f[3], f[4], f[5])
    }
}

impl From<Instruction> for [u32; 6] {
    fn from(i: Instruction) -> Self {
        [i.mode, i.op, i.dest_shared, i.dest, i.src_shared, i.src]
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let dest = if self.writes_shared() { "s" } else { "r" };
        let src = match (self.reads_input(), self.reads_shared()) {
            (true, _) => "in",
            (false, true) => "s",
            (false, false) => "r",
        };
        write!(
            f,
            "{} {}{}, {}{}",
            ScalarOp::from_code(self.op).mnemonic(),
            dest,
            self.dest,
            src,
            self.src
        )
    }
}

/// Instruction field selector, in storage order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Mode,
    Operation,
    DestShared,
    Destination,
    SourceShared,
    Source,
}

impl Field {
    pub const ALL: [Field; Instruction::FIELD_COUNT] = [
        Field::Mode,
        Field::Operation,
        Field::DestShared,
        Field::Destination,
        Field::SourceShared,
        Field::Source,
    ];

    pub fn index(self) -> usize {
        self as usize
    }

    /// Exclusive upper bound for sampled values of this field
    pub fn range(self, ranges: &InstructionRanges) -> u32 {
        match self {
            Field::Mode | Field::DestShared | Field::SourceShared => 2,
            Field::Operation => ranges.operations,
            Field::Destination => ranges.destinations,
            Field::Source => ranges.sources,
        }
    }
}

/// Sampling ranges for new and mutated instructions
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstructionRanges {
    pub operations: u32,
    pub destinations: u32,
    pub sources: u32,
    /// Longest program a mutation may grow
    pub max_length: usize,
}

impl InstructionRanges {
    pub fn from_settings(settings: &ProgramSettings) -> Self {
        Self {
            operations: OPERATION_COUNT,
            destinations: settings.destination_range.max(1),
            sources: settings.source_range.max(1),
            max_length: settings.max_program_length.max(1),
        }
    }
}

impl Default for InstructionRanges {
    fn default() -> Self {
        Self::from_settings(&ProgramSettings::default())
    }
}

/// Scalar mode operations
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarOp {
    Add,
    Sub,
    Mul,
    /// No-op when the source is exactly zero
    Div,
    /// `ln(src)`; no-op when the source is not positive
    Log,
    Exp,
    Sin,
    /// Negates the destination, ignores the source
    Negate,
}

impl ScalarOp {
    pub fn from_code(code: u32) -> Self {
        match code % OPERATION_COUNT {
            0 => ScalarOp::Add,
            1 => ScalarOp::Sub,
            2 => ScalarOp::Mul,
            3 => ScalarOp::Div,
            4 => ScalarOp::Log,
            5 => ScalarOp::Exp,
            6 => ScalarOp::Sin,
            _ => ScalarOp::Negate,
        }
    }

    pub fn mnemonic(self) -> &'static str {
        match self {
            ScalarOp::Add => "ADD",
            ScalarOp::Sub => "SUB",
            ScalarOp::Mul => "MUL",
            ScalarOp::Div => "DIV",
            ScalarOp::Log => "LOG",
            ScalarOp::Exp => "EXP",
            ScalarOp::Sin => "SIN",
            ScalarOp::Negate => "NEG",
        }
    }
}

/// Vector mode operations writing a private vector register
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VectorOp {
    Add,
    Sub,
    Mul,
    Div,
    Negate,
    Exp,
    Cos,
    Tanh,
}

impl VectorOp {
    pub fn from_code(code: u32) -> Self {
        match code % OPERATION_COUNT {
            0 => VectorOp::Add,
            1 => VectorOp::Sub,
            2 => VectorOp::Mul,
            3 => VectorOp::Div,
            4 => VectorOp::Negate,
            5 => VectorOp::Exp,
            6 => VectorOp::Cos,
            _ => VectorOp::Tanh,
        }
    }
}

/// Vector mode operations writing a shared scalar slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReduceOp {
    Dot,
    Cosine,
    Distance,
    ArgMax,
    ArgMin,
    Mean,
    Min,
    Max,
}

impl ReduceOp {
    pub fn from_code(code: u32) -> Self {
        match code % OPERATION_COUNT {
            0 => ReduceOp::Dot,
            1 => ReduceOp::Cosine,
            2 => ReduceOp::Distance,
            3 => ReduceOp::ArgMax,
            4 => ReduceOp::ArgMin,
            5 => ReduceOp::Mean,
            6 => ReduceOp::Min,
            _ => ReduceOp::Max,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_field_order_matches_tuple() {
        let inst = Instruction::from([1, 2, 0, 3, 1, 9]);
        for (i, field) in Field::ALL.iter().enumerate() {
            assert_eq!(field.index(), i);
        }
        assert_eq!(inst.get(Field::Operation), 2);
        assert_eq!(inst.get(Field::Source), 9);
        assert!(inst.reads_input());
        assert!(!inst.writes_shared());
    }

    #[test]
    fn test_random_respects_ranges() {
        let mut rng = StdRng::seed_from_u64(7);
        let ranges = InstructionRanges {
            operations: 8,
            destinations: 4,
            sources: 10,
            max_length: 16,
        };
        for _ in 0..500 {
            let inst = Instruction::random(&mut rng, &ranges);
            assert!(inst.mode <= 1 && inst.dest_shared <= 1 && inst.src_shared <= 1);
            assert!(inst.op < 8 && inst.dest < 4 && inst.src < 10);
        }
    }

    #[test]
    fn test_opcode_wraps() {
        assert_eq!(ScalarOp::from_code(11), ScalarOp::Div);
        assert_eq!(ReduceOp::from_code(8), ReduceOp::Dot);
        assert_eq!(VectorOp::from_code(7), VectorOp::Tanh);
    }

    #[test]
    fn test_serializes_as_tuple() {
        let inst = Instruction::new(1, 0, 0, 0, 0, 3);
        let json = serde_json::to_string(&inst).unwrap();
        assert_eq!(json, "[1,0,0,0,0,3]");
        let back: Instruction = serde_json::from_str(&json).unwrap();
        assert_eq!(back, inst);
    }

    #[test]
    fn test_display() {
        assert_eq!(Instruction::new(1, 0, 0, 0, 0, 3).to_string(), "ADD r0, in3");
        assert_eq!(Instruction::new(0, 7, 1, 2, 1, 5).to_string(), "NEG s2, s5");
    }
}
