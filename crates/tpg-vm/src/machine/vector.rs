//! Vector interpretation
//!
//! Registers are `count` vectors of `width` elements. A source is either a
//! vector register (mode 0) or a row/column slice of the input viewed as a
//! `rows x cols` matrix (mode 1, `src_shared` picks column). Writes to a
//! private register are elementwise; writes to the shared bank reduce the
//! destination register and the source vector to one scalar.
//!
//! The result is element 0 of vector register 0.

use super::{normalize, SharedBank};
use crate::program::instruction::{Instruction, ReduceOp, VectorOp};

/// Splits a raw source index into (row, col).
///
/// The low `col_bits` bits address the column and the rest the row, each
/// reduced modulo its dimension. `col_bits` is the number of bits needed to
/// hold `cols - 1`, derived from the shape being addressed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SourceDecoder {
    rows: usize,
    cols: usize,
    col_bits: u32,
}

impl SourceDecoder {
    pub fn for_shape(rows: usize, cols: usize) -> Self {
        let rows = rows.max(1);
        let cols = cols.max(1);
        let col_bits = usize::BITS - (cols - 1).leading_zeros();
        Self {
            rows,
            cols,
            col_bits,
        }
    }

    pub fn col_bits(&self) -> u32 {
        self.col_bits
    }

    #[inline]
    pub fn decode(&self, src: u32) -> (usize, usize) {
        let src = src as usize;
        let mask = 1usize
            .checked_shl(self.col_bits)
            .map_or(usize::MAX, |bit| bit - 1);
        let row = src.checked_shr(self.col_bits).unwrap_or(0) % self.rows;
        let col = (src & mask) % self.cols;
        (row, col)
    }

    /// Inverse of [`decode`](Self::decode) for in-range coordinates
    pub fn encode(&self, row: usize, col: usize) -> u32 {
        ((row << self.col_bits) | col) as u32
    }
}

/// Vector register file, stored flat
#[derive(Debug, Clone, PartialEq)]
pub struct VectorFile {
    count: usize,
    width: usize,
    values: Vec<f64>,
}

impl VectorFile {
    /// `count` zeroed registers of `width` elements (both at least 1)
    pub fn new(count: usize, width: usize) -> Self {
        let count = count.max(1);
        let width = width.max(1);
        Self {
            count,
            width,
            values: vec![0.0; count * width],
        }
    }

    /// Square file, as learners use: `registers` vectors of `registers` elements
    pub fn square(registers: usize) -> Self {
        Self::new(registers, registers)
    }

    pub fn reset(&mut self) {
        self.values.fill(0.0);
    }

    pub fn count(&self) -> usize {
        self.count
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn row(&self, index: usize) -> &[f64] {
        let start = (index % self.count) * self.width;
        &self.values[start..start + self.width]
    }

    pub fn row_mut(&mut self, index: usize) -> &mut [f64] {
        let start = (index % self.count) * self.width;
        &mut self.values[start..start + self.width]
    }
}

/// Run `instructions` over `input` viewed as a `rows x cols` matrix.
///
/// `file` is zeroed first. Only `file` and group `share_group` of `shared`
/// are written.
pub fn execute(
    input: &[f64],
    shape: (usize, usize),
    file: &mut VectorFile,
    instructions: &[Instruction],
    shared: &mut SharedBank,
    share_group: usize,
) -> f64 {
    file.reset();
    let (rows, cols) = fit_shape(input.len(), shape);
    let decoder = SourceDecoder::for_shape(rows, cols);
    let mut source = vec![0.0; file.width()];

    for inst in instructions {
        if inst.reads_input() {
            load_slice(input, cols, &decoder, inst, &mut source);
        } else {
            source.copy_from_slice(file.row(inst.src as usize));
        }

        if inst.writes_shared() {
            let value = reduce(
                ReduceOp::from_code(inst.op),
                file.row(inst.dest as usize),
                &source,
            );
            if let Some(value) = value {
                *shared.slot_mut(share_group, inst.dest as usize) = normalize(value);
            }
        } else {
            elementwise(
                VectorOp::from_code(inst.op),
                file.row_mut(inst.dest as usize),
                &source,
            );
        }
    }

    file.row(0)[0]
}

/// Shape guard: a shape that does not describe `len` values is treated as one row
fn fit_shape(len: usize, (rows, cols): (usize, usize)) -> (usize, usize) {
    if rows == 0 || cols == 0 || rows * cols != len {
        (1, len.max(1))
    } else {
        (rows, cols)
    }
}

/// Row slice `input[row, col..]` or column slice `input[row.., col]`, zero padded
fn load_slice(
    input: &[f64],
    cols: usize,
    decoder: &SourceDecoder,
    inst: &Instruction,
    out: &mut [f64],
) {
    out.fill(0.0);
    if input.is_empty() {
        return;
    }
    let (row, col) = decoder.decode(inst.src);
    let rows = input.len() / cols;
    if inst.reads_shared() {
        for (k, slot) in out.iter_mut().enumerate().take(rows - row) {
            *slot = input[(row + k) * cols + col];
        }
    } else {
        let start = row * cols + col;
        let end = (row + 1) * cols;
        for (slot, &value) in out.iter_mut().zip(&input[start..end]) {
            *slot = value;
        }
    }
}

fn elementwise(op: VectorOp, dest: &mut [f64], src: &[f64]) {
    for (x, &y) in dest.iter_mut().zip(src) {
        let value = match op {
            VectorOp::Add => *x + y,
            VectorOp::Sub => *x - y,
            VectorOp::Mul => *x * y,
            VectorOp::Div => {
                if y == 0.0 {
                    continue;
                }
                *x / y
            }
            VectorOp::Negate => -*x,
            VectorOp::Exp => y.exp(),
            VectorOp::Cos => y.cos(),
            VectorOp::Tanh => y.tanh(),
        };
        *x = normalize(value);
    }
}

/// `None` means leave the destination slot unchanged
fn reduce(op: ReduceOp, x: &[f64], y: &[f64]) -> Option<f64> {
    let dot = || x.iter().zip(y).map(|(a, b)| a * b).sum::<f64>();
    let norm = |v: &[f64]| v.iter().map(|a| a * a).sum::<f64>().sqrt();
    let value = match op {
        ReduceOp::Dot => dot(),
        ReduceOp::Cosine => {
            let denom = norm(x) * norm(y);
            if denom == 0.0 {
                return None;
            }
            dot() / denom
        }
        ReduceOp::Distance => x
            .iter()
            .zip(y)
            .map(|(a, b)| (a - b) * (a - b))
            .sum::<f64>()
            .sqrt(),
        ReduceOp::ArgMax => arg_best(y, |candidate, best| candidate > best) as f64,
        ReduceOp::ArgMin => arg_best(y, |candidate, best| candidate < best) as f64,
        ReduceOp::Mean => y.iter().sum::<f64>() / y.len() as f64,
        ReduceOp::Min => y.iter().copied().fold(f64::INFINITY, f64::min),
        ReduceOp::Max => y.iter().copied().fold(f64::NEG_INFINITY, f64::max),
    };
    Some(value)
}

/// Index of the first element that beats all others
fn arg_best(values: &[f64], better: impl Fn(f64, f64) -> bool) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if better(v, values[best]) {
            best = i;
        }
    }
    best
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn grid() -> Vec<f64> {
        // 4 x 5 matrix, value = 10 * row + col
        (0..4)
            .flat_map(|r| (0..5).map(move |c| (10 * r + c) as f64))
            .collect()
    }

    #[test]
    fn test_decoder_derived_from_shape() {
        let decoder = SourceDecoder::for_shape(28, 28);
        assert_eq!(decoder.col_bits(), 5);
        let src = decoder.encode(3, 17);
        assert_eq!(decoder.decode(src), (3, 17));
        assert_eq!(SourceDecoder::for_shape(1, 1).col_bits(), 0);
        assert_eq!(SourceDecoder::for_shape(4, 8).col_bits(), 3);
    }

    #[test]
    fn test_decoder_wraps_large_indices() {
        let decoder = SourceDecoder::for_shape(4, 5);
        let (row, col) = decoder.decode(u32::MAX);
        assert!(row < 4 && col < 5);
    }

    #[test]
    fn test_row_slice_padded() {
        let input = grid();
        let decoder = SourceDecoder::for_shape(4, 5);
        let mut file = VectorFile::square(4);
        let mut bank = SharedBank::new(1, 4);
        // v0 += row 2 starting at col 3 -> [23, 24, 0, 0]
        let program = [Instruction::new(1, 0, 0, 0, 0, decoder.encode(2, 3))];
        let out = execute(&input, (4, 5), &mut file, &program, &mut bank, 0);
        assert_eq!(out, 23.0);
        assert_eq!(file.row(0), &[23.0, 24.0, 0.0, 0.0]);
    }

    #[test]
    fn test_column_slice_padded() {
        let input = grid();
        let decoder = SourceDecoder::for_shape(4, 5);
        let mut file = VectorFile::square(4);
        let mut bank = SharedBank::new(1, 4);
        // v1 += column 4 starting at row 1 -> [14, 24, 34, 0]
        let program = [Instruction::new(1, 0, 0, 1, 1, decoder.encode(1, 4))];
        execute(&input, (4, 5), &mut file, &program, &mut bank, 0);
        assert_eq!(file.row(1), &[14.0, 24.0, 34.0, 0.0]);
    }

    #[test]
    fn test_reductions_into_shared_slots() {
        let input = grid();
        let decoder = SourceDecoder::for_shape(4, 5);
        let mut file = VectorFile::square(4);
        let mut bank = SharedBank::new(2, 8);
        let row1 = decoder.encode(1, 0); // [10, 11, 12, 13]
        let program = [
            Instruction::new(1, 0, 0, 0, 0, row1), // v0 = row1
            Instruction::new(1, 0, 1, 0, 0, row1), // s0 = v0 . row1
            Instruction::new(1, 3, 1, 3, 0, row1), // s3 = argmax(row1)
            Instruction::new(1, 4, 1, 4, 0, row1), // s4 = argmin(row1)
            Instruction::new(1, 5, 1, 5, 0, row1), // s5 = mean(row1)
            Instruction::new(1, 6, 1, 6, 0, row1), // s6 = min(row1)
            Instruction::new(1, 7, 1, 7, 0, row1), // s7 = max(row1)
            Instruction::new(1, 2, 1, 2, 0, row1), // s2 = |v2 - row1|
        ];
        execute(&input, (4, 5), &mut file, &program, &mut bank, 1);
        let g = bank.group(1);
        assert_eq!(g[0], 100.0 + 121.0 + 144.0 + 169.0);
        assert_eq!(g[3], 3.0);
        assert_eq!(g[4], 0.0);
        assert_eq!(g[5], 11.5);
        assert_eq!(g[6], 10.0);
        assert_eq!(g[7], 13.0);
        assert!((g[2] - (534.0f64).sqrt()).abs() < 1e-12);
        assert_eq!(bank.group(0), &[0.0; 8]);
    }

    #[test]
    fn test_cosine_with_zero_vector_is_noop() {
        let input = grid();
        let mut file = VectorFile::square(4);
        let mut bank = SharedBank::new(1, 4);
        *bank.slot_mut(0, 1) = 42.0;
        // v1 is all zeros, so cosine is undefined
        let program = [Instruction::new(1, 1, 1, 1, 0, 5)];
        execute(&input, (4, 5), &mut file, &program, &mut bank, 0);
        assert_eq!(bank.get(0, 1), 42.0);
    }

    #[test]
    fn test_elementwise_div_skips_zero_divisor() {
        let input = grid();
        let decoder = SourceDecoder::for_shape(4, 5);
        let mut file = VectorFile::square(4);
        let mut bank = SharedBank::new(1, 1);
        let program = [
            Instruction::new(1, 0, 0, 0, 0, decoder.encode(1, 0)), // v0 = [10, 11, 12, 13]
            Instruction::new(1, 3, 0, 0, 0, decoder.encode(0, 0)), // v0 /= [0, 1, 2, 3]
        ];
        execute(&input, (4, 5), &mut file, &program, &mut bank, 0);
        assert_eq!(file.row(0), &[10.0, 11.0, 6.0, 13.0 / 3.0]);
    }

    #[test]
    fn test_mismatched_shape_treated_as_single_row() {
        let input = [1.0, 2.0, 3.0];
        let mut file = VectorFile::square(2);
        let mut bank = SharedBank::new(1, 1);
        let program = [Instruction::new(1, 0, 0, 0, 0, 1)];
        let out = execute(&input, (7, 7), &mut file, &program, &mut bank, 0);
        assert_eq!(out, 2.0);
        assert_eq!(file.row(0), &[2.0, 3.0]);
    }

    proptest! {
        #[test]
        fn prop_vector_outputs_always_finite(
            program in prop::collection::vec(any::<[u32; 6]>().prop_map(Instruction::from), 1..48),
            input in prop::collection::vec(-1e3f64..1e3, 12),
            registers in 1usize..6,
            share_group in any::<usize>(),
        ) {
            let mut file = VectorFile::square(registers);
            let mut bank = SharedBank::new(3, 3);
            let out = execute(&input, (3, 4), &mut file, &program, &mut bank, share_group);
            prop_assert!(out.is_finite());
            prop_assert!(bank.values().iter().all(|v| v.is_finite()));
            for r in 0..file.count() {
                prop_assert!(file.row(r).iter().all(|v| v.is_finite()));
            }
        }
    }
}
