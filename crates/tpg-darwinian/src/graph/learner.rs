//! Learner: one program, one addressing strategy, one action

use std::borrow::Cow;
use std::collections::VecDeque;

use serde::{Deserialize, Serialize};

use tpg_common::{Action, LearnerId, Observation};
use tpg_vm::{Addressing, ExecutionMode, ObservationAddressing, Program, SharedBank};

/// A bidding unit of the graph.
///
/// Learners live in a [`Graph`](super::Graph) arena; the graph owns every
/// edit that touches reference counts (the action edge and team membership).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Learner {
    pub(crate) id: LearnerId,
    pub(crate) program: Program,
    pub(crate) mode: ExecutionMode,
    pub(crate) addressing: Addressing,
    pub(crate) share_group: usize,
    pub(crate) action: Action,
    /// Teams listing this learner
    pub(crate) num_teams_referencing: u32,
    /// Private register count
    pub(crate) registers: usize,
    /// Recently seen observations, newest last
    #[serde(skip)]
    pub(crate) states: VecDeque<Observation>,
}

impl Learner {
    pub fn id(&self) -> LearnerId {
        self.id
    }

    pub fn program(&self) -> &Program {
        &self.program
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn addressing(&self) -> &Addressing {
        &self.addressing
    }

    pub fn share_group(&self) -> usize {
        self.share_group
    }

    pub fn action(&self) -> &Action {
        &self.action
    }

    pub fn is_action_atomic(&self) -> bool {
        self.action.is_atomic()
    }

    pub fn num_teams_referencing(&self) -> u32 {
        self.num_teams_referencing
    }

    pub fn registers(&self) -> usize {
        self.registers
    }

    pub fn states(&self) -> impl Iterator<Item = &Observation> {
        self.states.iter()
    }

    /// The slice of `input` this learner's program runs on
    pub fn addressed<'a>(&self, input: &'a Observation) -> Cow<'a, Observation> {
        self.addressing.address(input)
    }

    /// Run the program on a zeroed register file over the addressed input.
    ///
    /// Only `shared` is written.
    pub fn bid(&self, input: &Observation, shared: &mut SharedBank) -> f64 {
        let addressed = self.addressing.address(input);
        self.program
            .execute(self.mode, &addressed, self.registers, shared, self.share_group)
    }

    /// Remember `input`, keeping at most `limit` observations
    pub fn save_state(&mut self, input: &Observation, limit: usize) {
        if limit == 0 {
            return;
        }
        while self.states.len() >= limit {
            self.states.pop_front();
        }
        self.states.push_back(input.clone());
    }
}
