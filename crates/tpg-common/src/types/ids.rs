//! Stable integer ids for graph nodes
//!
//! Ids are handed out by an [`IdAllocator`] owned by whoever owns the
//! population. There is no process-wide counter, so independent populations
//! can coexist and a resumed population continues its own sequence.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Program identity, kept for traceability across clones
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProgramId(pub u64);

/// Learner arena index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct LearnerId(pub u64);

/// Team arena index
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TeamId(pub u64);

impl fmt::Display for ProgramId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "program:{}", self.0)
    }
}

impl fmt::Display for LearnerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "learner:{}", self.0)
    }
}

impl fmt::Display for TeamId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "team:{}", self.0)
    }
}

/// Monotonic id counters, one per entity type
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdAllocator {
    next_program: u64,
    next_learner: u64,
    next_team: u64,
}

impl IdAllocator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn next_program(&mut self) -> ProgramId {
        let id = ProgramId(self.next_program);
        self.next_program += 1;
        id
    }

    pub fn next_learner(&mut self) -> LearnerId {
        let id = LearnerId(self.next_learner);
        self.next_learner += 1;
        id
    }

    pub fn next_team(&mut self) -> TeamId {
        let id = TeamId(self.next_team);
        self.next_team += 1;
        id
    }

    /// Number of program ids handed out so far
    pub fn programs_issued(&self) -> u64 {
        self.next_program
    }

    /// Number of learner ids handed out so far
    pub fn learners_issued(&self) -> u64 {
        self.next_learner
    }

    /// Number of team ids handed out so far
    pub fn teams_issued(&self) -> u64 {
        self.next_team
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_are_monotonic_per_kind() {
        let mut ids = IdAllocator::new();
        assert_eq!(ids.next_program(), ProgramId(0));
        assert_eq!(ids.next_program(), ProgramId(1));
        assert_eq!(ids.next_learner(), LearnerId(0));
        assert_eq!(ids.next_team(), TeamId(0));
        assert_eq!(ids.programs_issued(), 2);
    }

    #[test]
    fn test_independent_allocators() {
        let mut a = IdAllocator::new();
        let mut b = IdAllocator::new();
        a.next_team();
        a.next_team();
        assert_eq!(b.next_team(), TeamId(0));
        assert_eq!(a.next_team(), TeamId(2));
    }

    #[test]
    fn test_display() {
        assert_eq!(LearnerId(4).to_string(), "learner:4");
    }
}
