//! Team: a set of learners competing by bid

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tpg_common::{LearnerId, TeamId};

/// Graph node aggregating learners
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Team {
    pub(crate) id: TeamId,
    /// Members in bid order; the first of equal bids wins
    pub(crate) learners: Vec<LearnerId>,
    /// Learners whose action points here
    pub(crate) num_learners_referencing: u32,
    /// Scores by task name
    pub(crate) outcomes: BTreeMap<String, f64>,
}

impl Team {
    pub(crate) fn new(id: TeamId) -> Self {
        Self {
            id,
            learners: Vec::new(),
            num_learners_referencing: 0,
            outcomes: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> TeamId {
        self.id
    }

    pub fn learners(&self) -> &[LearnerId] {
        &self.learners
    }

    pub fn contains(&self, learner: LearnerId) -> bool {
        self.learners.contains(&learner)
    }

    pub fn num_learners_referencing(&self) -> u32 {
        self.num_learners_referencing
    }

    /// Root candidate: no learner points here
    pub fn is_root(&self) -> bool {
        self.num_learners_referencing == 0
    }

    pub fn outcomes(&self) -> &BTreeMap<String, f64> {
        &self.outcomes
    }

    pub fn outcome(&self, task: &str) -> Option<f64> {
        self.outcomes.get(task).copied()
    }
}
