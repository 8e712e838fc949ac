//! Learner actions
//!
//! A learner either terminates a decision with an atomic action or points at
//! another team. Team edges are plain ids into the population arena; the
//! reference counts that protect shared sub-graphs live in the arena.

use serde::{Deserialize, Serialize};

use super::ids::TeamId;

/// Terminal decision value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AtomicAction {
    /// Single-label classification
    Label(i64),
    /// Multi-label / continuous output, each coordinate in [0, 1]
    Vector(Vec<f64>),
}

/// What a learner does when it wins a bid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Atomic(AtomicAction),
    Team(TeamId),
}

impl Action {
    pub fn label(label: i64) -> Self {
        Action::Atomic(AtomicAction::Label(label))
    }

    pub fn vector(values: Vec<f64>) -> Self {
        Action::Atomic(AtomicAction::Vector(values))
    }

    pub fn is_atomic(&self) -> bool {
        matches!(self, Action::Atomic(_))
    }

    /// Target team if this is an edge
    pub fn team(&self) -> Option<TeamId> {
        match self {
            Action::Team(id) => Some(*id),
            Action::Atomic(_) => None,
        }
    }
}

impl From<AtomicAction> for Action {
    fn from(atomic: AtomicAction) -> Self {
        Action::Atomic(atomic)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_team_edge() {
        let action = Action::Team(TeamId(3));
        assert!(!action.is_atomic());
        assert_eq!(action.team(), Some(TeamId(3)));
        assert_eq!(Action::label(1).team(), None);
    }

    #[test]
    fn test_serde_tagging() {
        let json = serde_json::to_string(&Action::label(4)).unwrap();
        assert_eq!(json, r#"{"atomic":{"label":4}}"#);
        let back: Action = serde_json::from_str(&json).unwrap();
        assert_eq!(back, Action::label(4));
    }
}
