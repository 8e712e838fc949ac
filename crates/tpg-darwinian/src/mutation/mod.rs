//! Learner mutation
//!
//! One call applies any subset of: program mutation, execution mode toggle,
//! action-edge mutation, share group reassignment, and addressing
//! perturbation. Each fires independently; the round is repeated until at
//! least one of them changed the learner, up to `max_change_attempts`.

mod action;

use rand::Rng;
use tracing::{debug, warn};

use tpg_common::{AtomicAction, GraphError, LearnerId, Result, TeamId};
use tpg_vm::rng::{flip, resample_different};
use tpg_vm::{ObservationAddressing, ProgramMutation, SharedBank, UniquenessCorpus};

use crate::graph::Graph;

/// Where the learner sits and what it may switch to
#[derive(Debug, Clone, Copy)]
pub struct MutationScope<'a> {
    /// Team owning the learner; never chosen as its new target
    pub parent: Option<TeamId>,
    /// Atomic action pool
    pub atomics: &'a [AtomicAction],
    /// Learners whose remembered states form the uniqueness corpus
    pub reference_learners: &'a [LearnerId],
}

/// What one [`Graph::mutate_learner`] call changed
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MutationReport {
    pub program: Option<ProgramMutation>,
    pub mode_toggled: bool,
    pub action_changed: bool,
    pub share_group_changed: bool,
    pub addressing_moved: bool,
    /// Rounds used, including the successful one
    pub rounds: usize,
}

impl MutationReport {
    pub fn changed(&self) -> bool {
        self.program.map_or(false, |p| p.changed())
            || self.mode_toggled
            || self.action_changed
            || self.share_group_changed
            || self.addressing_moved
    }
}

impl Graph {
    /// `(addressed input, output)` pairs from the reference learners' states,
    /// addressed and executed the way `learner` would see them
    pub fn uniqueness_corpus(
        &self,
        learner: LearnerId,
        reference_learners: &[LearnerId],
    ) -> Result<UniquenessCorpus> {
        let target = self.learner(learner)?;
        let mut corpus = UniquenessCorpus::new(target.mode, &self.config.registers);
        let mut bank = SharedBank::new(
            self.config.registers.shared_groups,
            self.config.registers.shared_slots,
        );
        for &id in reference_learners {
            let reference = self.learner(id)?;
            for state in reference.states() {
                bank.reset();
                let output = reference.bid(state, &mut bank);
                corpus.push(target.addressed(state).into_owned(), output);
            }
        }
        Ok(corpus)
    }

    /// Mutate `learner` until something changes or the round budget is spent
    pub fn mutate_learner<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        learner: LearnerId,
        scope: MutationScope<'_>,
    ) -> Result<MutationReport> {
        let corpus = if scope.reference_learners.is_empty() {
            None
        } else {
            Some(self.uniqueness_corpus(learner, scope.reference_learners)?)
        };
        let settings = self.config.mutation.clone();
        let groups = self.config.registers.shared_groups;
        let vector_mode = self.config.addressing.vector_mode;

        let mut report = MutationReport::default();
        for round in 1..=settings.max_change_attempts {
            report.rounds = round;

            if flip(rng, settings.program) {
                let l = self
                    .learners
                    .get_mut(&learner)
                    .ok_or(GraphError::UnknownLearner(learner))?;
                let outcome = l.program.mutate(rng, &settings, &self.ranges, corpus.as_ref());
                if outcome.changed() {
                    report.program = Some(outcome);
                }
            }

            if vector_mode && flip(rng, settings.program) {
                let l = self.learner_mut(learner)?;
                l.mode = l.mode.toggled();
                report.mode_toggled = true;
            }

            if flip(rng, settings.action) {
                report.action_changed |=
                    self.mutate_action(rng, learner, scope.parent, scope.atomics)?;
            }

            if flip(rng, settings.action) {
                let l = self.learner_mut(learner)?;
                if let Some(group) = resample_different(rng, groups as u32, l.share_group as u32) {
                    l.share_group = group as usize;
                    report.share_group_changed = true;
                }
            }

            if flip(rng, settings.action) {
                report.addressing_moved |= self.learner_mut(learner)?.addressing.perturb(rng);
            }

            if report.changed() {
                debug!(
                    learner = %learner,
                    rounds = round,
                    program = ?report.program,
                    mode = report.mode_toggled,
                    action = report.action_changed,
                    share_group = report.share_group_changed,
                    addressing = report.addressing_moved,
                    "Mutated learner"
                );
                return Ok(report);
            }
        }

        warn!(
            learner = %learner,
            rounds = settings.max_change_attempts,
            "Learner mutation budget exhausted without a change"
        );
        Ok(report)
    }
}
