//! Program mutation operators
//!
//! Every retry-until-changed loop here is bounded by the configured
//! `max_change_attempts`; a loop that runs out returns "unchanged" instead of
//! spinning on rates that can never fire.

use rand::seq::SliceRandom;
use rand::Rng;
use tracing::{trace, warn};

use tpg_common::{MutationSettings, Observation, RegisterSettings};

use super::instruction::{Field, Instruction, InstructionRanges};
use super::Program;
use crate::machine::{ExecutionMode, SharedBank};
use crate::rng::{flip, resample_different};

/// Per-pass probabilities of the four structural operators
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct InstructionRates {
    pub delete: f64,
    pub add: f64,
    pub swap: f64,
    pub mutate: f64,
}

impl InstructionRates {
    pub fn from_settings(settings: &MutationSettings) -> Self {
        Self {
            delete: settings.delete_instruction,
            add: settings.add_instruction,
            swap: settings.swap_instruction,
            mutate: settings.mutate_instruction,
        }
    }
}

/// Outcome of [`Program::mutate`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProgramMutation {
    /// No operator managed to change the program
    Unchanged,
    /// Unconditional mutation, `passes` successful passes applied
    Mutated { passes: usize },
    /// Output differs from every corpus entry
    Distinct { attempts: usize },
    /// Uniqueness budget ran out; the last attempt is kept
    Duplicate { attempts: usize },
}

impl ProgramMutation {
    pub fn changed(&self) -> bool {
        !matches!(self, ProgramMutation::Unchanged)
    }
}

/// Reference outputs a mutated program must stay away from.
///
/// Entries are `(addressed input, output)` pairs recorded from other
/// learners. A candidate is run on each input with a fresh register file and
/// a zeroed shared bank, in the execution mode of the learner that owns it.
#[derive(Debug, Clone)]
pub struct UniquenessCorpus {
    mode: ExecutionMode,
    registers: usize,
    shared_groups: usize,
    shared_slots: usize,
    entries: Vec<(Observation, f64)>,
}

impl UniquenessCorpus {
    pub fn new(mode: ExecutionMode, registers: &RegisterSettings) -> Self {
        Self {
            mode,
            registers: registers.count,
            shared_groups: registers.shared_groups,
            shared_slots: registers.shared_slots,
            entries: Vec::new(),
        }
    }

    pub fn push(&mut self, input: Observation, output: f64) {
        self.entries.push((input, output));
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// True when `program` is at least `threshold` away from every entry
    pub fn distinguishes(&self, program: &Program, threshold: f64) -> bool {
        let mut bank = SharedBank::new(self.shared_groups, self.shared_slots);
        self.entries.iter().all(|(input, expected)| {
            bank.reset();
            let output = program.execute(self.mode, input, self.registers, &mut bank, 0);
            (expected - output).abs() >= threshold
        })
    }
}

impl Program {
    /// Apply delete / mutate / swap / add, each independently, until at least
    /// one of them changes the program or `max_attempts` passes fail.
    ///
    /// Delete and swap need two instructions; add stops at
    /// `ranges.max_length`. Returns whether the program changed.
    pub fn mutate_instructions<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        rates: &InstructionRates,
        ranges: &InstructionRanges,
        max_attempts: usize,
    ) -> bool {
        for _ in 0..max_attempts {
            let mut changed = false;

            if self.instructions.len() > 1 && flip(rng, rates.delete) {
                let index = rng.gen_range(0..self.instructions.len());
                self.instructions.remove(index);
                changed = true;
            }

            if flip(rng, rates.mutate) {
                changed |= self.mutate_field(rng, ranges);
            }

            if self.instructions.len() > 1 && flip(rng, rates.swap) {
                let len = self.instructions.len();
                let a = rng.gen_range(0..len);
                let b = (a + rng.gen_range(1..len)) % len;
                if self.instructions[a] != self.instructions[b] {
                    self.instructions.swap(a, b);
                    changed = true;
                }
            }

            if self.instructions.len() < ranges.max_length && flip(rng, rates.add) {
                let index = rng.gen_range(0..=self.instructions.len());
                self.instructions
                    .insert(index, Instruction::random(rng, ranges));
                changed = true;
            }

            if changed {
                return true;
            }
        }

        warn!(
            program = %self.id,
            attempts = max_attempts,
            "Instruction mutation budget exhausted without a change"
        );
        false
    }

    /// Resample one field of one instruction to a different in-range value
    fn mutate_field<R: Rng + ?Sized>(&mut self, rng: &mut R, ranges: &InstructionRanges) -> bool {
        let index = rng.gen_range(0..self.instructions.len());
        let Some(&field) = Field::ALL.choose(rng) else {
            return false;
        };
        let inst = &mut self.instructions[index];
        match resample_different(rng, field.range(ranges), inst.get(field)) {
            Some(value) => {
                inst.set(field, value);
                true
            }
            None => false,
        }
    }

    /// Mutate the instruction sequence.
    ///
    /// With a corpus, re-mutates until the output is distinct from every
    /// entry by `unique_program_threshold`, for at most
    /// `max_unique_attempts` rounds. Without one, applies a first pass and
    /// keeps adding passes while `program_repeat` fires.
    pub fn mutate<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        settings: &MutationSettings,
        ranges: &InstructionRanges,
        corpus: Option<&UniquenessCorpus>,
    ) -> ProgramMutation {
        let rates = InstructionRates::from_settings(settings);
        let budget = settings.max_change_attempts;

        match corpus {
            Some(corpus) => {
                let rounds = settings.max_unique_attempts.max(1);
                let mut any_change = false;
                for attempt in 1..=rounds {
                    if !self.mutate_instructions(rng, &rates, ranges, budget) {
                        continue;
                    }
                    any_change = true;
                    if corpus.distinguishes(self, settings.unique_program_threshold) {
                        trace!(program = %self.id, attempt, "Found distinct program");
                        return ProgramMutation::Distinct { attempts: attempt };
                    }
                }
                if !any_change {
                    return ProgramMutation::Unchanged;
                }
                warn!(
                    program = %self.id,
                    attempts = rounds,
                    corpus = corpus.len(),
                    "Uniqueness search exhausted, keeping last attempt"
                );
                ProgramMutation::Duplicate { attempts: rounds }
            }
            None => {
                let mut passes = 0;
                if self.mutate_instructions(rng, &rates, ranges, budget) {
                    passes += 1;
                }
                let mut extra = 0;
                while extra < budget && flip(rng, settings.program_repeat) {
                    extra += 1;
                    if self.mutate_instructions(rng, &rates, ranges, budget) {
                        passes += 1;
                    }
                }
                if passes == 0 {
                    ProgramMutation::Unchanged
                } else {
                    ProgramMutation::Mutated { passes }
                }
            }
        }
    }
}
