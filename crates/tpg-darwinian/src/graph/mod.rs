//! Population graph
//!
//! Teams and learners live in an arena keyed by stable integer ids. Edges are
//! ids, never references:
//!
//! - team -> learner: membership, counted by `Learner::num_teams_referencing`
//! - learner -> team: action edge, counted by `Team::num_learners_referencing`
//!
//! Every edit that adds, removes, or rewires an edge goes through this module
//! and updates the matching count in the same call. Counts never go negative;
//! an underflow is an invariant violation and is reported as
//! [`GraphError::ReferenceUnderflow`] before anything is changed.

mod act;
mod learner;
mod team;

use std::collections::{BTreeMap, VecDeque};

use rand::Rng;
use tracing::debug;

use tpg_common::{
    Action, ConfigError, GraphError, IdAllocator, LearnerId, Result, TeamId, TpgConfig,
};
use tpg_vm::{Addressing, ExecutionMode, InstructionRanges, Program};

pub use learner::Learner;
pub use team::Team;

/// Arena of teams and learners plus the id and sampling state they share
#[derive(Debug, Clone)]
pub struct Graph {
    pub(crate) config: TpgConfig,
    pub(crate) ranges: InstructionRanges,
    pub(crate) ids: IdAllocator,
    pub(crate) teams: BTreeMap<TeamId, Team>,
    pub(crate) learners: BTreeMap<LearnerId, Learner>,
}

impl Graph {
    /// Empty population; the config is validated first
    pub fn new(config: TpgConfig) -> Result<Self> {
        config.validate()?;
        let ranges = InstructionRanges::from_settings(&config.program);
        Ok(Self {
            config,
            ranges,
            ids: IdAllocator::new(),
            teams: BTreeMap::new(),
            learners: BTreeMap::new(),
        })
    }

    pub fn config(&self) -> &TpgConfig {
        &self.config
    }

    pub fn ranges(&self) -> &InstructionRanges {
        &self.ranges
    }

    pub fn ids(&self) -> &IdAllocator {
        &self.ids
    }

    pub fn team(&self, id: TeamId) -> Result<&Team> {
        self.teams
            .get(&id)
            .ok_or_else(|| GraphError::UnknownTeam(id).into())
    }

    pub fn learner(&self, id: LearnerId) -> Result<&Learner> {
        self.learners
            .get(&id)
            .ok_or_else(|| GraphError::UnknownLearner(id).into())
    }

    pub(crate) fn learner_mut(&mut self, id: LearnerId) -> Result<&mut Learner> {
        self.learners
            .get_mut(&id)
            .ok_or_else(|| GraphError::UnknownLearner(id).into())
    }

    pub(crate) fn team_mut(&mut self, id: TeamId) -> Result<&mut Team> {
        self.teams
            .get_mut(&id)
            .ok_or_else(|| GraphError::UnknownTeam(id).into())
    }

    pub fn teams(&self) -> impl Iterator<Item = &Team> {
        self.teams.values()
    }

    pub fn learners(&self) -> impl Iterator<Item = &Learner> {
        self.learners.values()
    }

    pub fn team_ids(&self) -> Vec<TeamId> {
        self.teams.keys().copied().collect()
    }

    pub fn learner_ids(&self) -> Vec<LearnerId> {
        self.learners.keys().copied().collect()
    }

    pub fn team_count(&self) -> usize {
        self.teams.len()
    }

    pub fn learner_count(&self) -> usize {
        self.learners.len()
    }

    // ============ Node creation ============

    /// New empty team
    pub fn add_team(&mut self) -> TeamId {
        let id = self.ids.next_team();
        self.teams.insert(id, Team::new(id));
        debug!(team = %id, "Added team");
        id
    }

    /// Random program with a fresh id
    pub fn create_program<R: Rng + ?Sized>(&mut self, rng: &mut R) -> Program {
        let id = self.ids.next_program();
        Program::random(id, rng, &self.ranges)
    }

    /// New learner with a random program, addressing and share group.
    ///
    /// With `vector_mode` enabled the execution mode is drawn uniformly.
    pub fn add_learner<R: Rng + ?Sized>(&mut self, rng: &mut R, action: Action) -> Result<LearnerId> {
        let program = self.create_program(rng);
        let addressing = Addressing::for_settings(rng, &self.config.addressing);
        let share_group = rng.gen_range(0..self.config.registers.shared_groups.max(1));
        let mode = if self.config.addressing.vector_mode && rng.gen::<bool>() {
            ExecutionMode::Vector
        } else {
            ExecutionMode::Scalar
        };
        let id = self.add_learner_with(program, action, addressing, share_group)?;
        self.learner_mut(id)?.mode = mode;
        Ok(id)
    }

    /// New learner from explicit parts; a team action must name a live team
    pub fn add_learner_with(
        &mut self,
        program: Program,
        action: Action,
        addressing: Addressing,
        share_group: usize,
    ) -> Result<LearnerId> {
        if let Some(target) = action.team() {
            self.team_mut(target)?.num_learners_referencing += 1;
        }
        let id = self.ids.next_learner();
        self.learners.insert(
            id,
            Learner {
                id,
                program,
                mode: ExecutionMode::Scalar,
                addressing,
                share_group,
                action,
                num_teams_referencing: 0,
                registers: self.config.registers.count,
                states: VecDeque::new(),
            },
        );
        Ok(id)
    }

    /// Offspring of `source`: copied instructions under a new program id,
    /// same action edge (counted again), share group, mode and addressing
    pub fn clone_learner(&mut self, source: LearnerId) -> Result<LearnerId> {
        let parent = self.learner(source)?;
        let action = parent.action.clone();
        let mode = parent.mode;
        let addressing = parent.addressing.clone();
        let share_group = parent.share_group;
        let registers = parent.registers;
        let template = parent.program.clone();

        let program = template.offspring(self.ids.next_program());
        let id = self.add_learner_with(program, action, addressing, share_group)?;
        let child = self.learner_mut(id)?;
        child.mode = mode;
        child.registers = registers;
        debug!(parent = %source, learner = %id, "Cloned learner");
        Ok(id)
    }

    // ============ Edges ============

    /// Put `learner` on `team`
    pub fn add_learner_to_team(&mut self, team: TeamId, learner: LearnerId) -> Result<()> {
        self.learner(learner)?;
        let t = self.team_mut(team)?;
        if t.contains(learner) {
            return Err(GraphError::AlreadyMember { team, learner }.into());
        }
        t.learners.push(learner);
        self.learner_mut(learner)?.num_teams_referencing += 1;
        Ok(())
    }

    /// Take `learner` off `team`
    pub fn remove_learner_from_team(&mut self, team: TeamId, learner: LearnerId) -> Result<()> {
        let count = self.learner(learner)?.num_teams_referencing;
        let t = self.team(team)?;
        let Some(position) = t.learners.iter().position(|&l| l == learner) else {
            return Err(GraphError::NotMember { team, learner }.into());
        };
        if count == 0 {
            return Err(GraphError::ReferenceUnderflow {
                node: learner.to_string(),
            }
            .into());
        }
        self.team_mut(team)?.learners.remove(position);
        self.learner_mut(learner)?.num_teams_referencing -= 1;
        Ok(())
    }

    /// Point `learner`'s action at `action`.
    ///
    /// The new target is checked and the old count is checked for underflow
    /// before anything changes; then the old target is decremented, the new
    /// target incremented, and the edge swapped.
    pub fn rewire(&mut self, learner: LearnerId, action: Action) -> Result<()> {
        let old = self.learner(learner)?.action.team();
        if let Some(new) = action.team() {
            self.team(new)?;
        }
        if let Some(old) = old {
            if self.team(old)?.num_learners_referencing == 0 {
                return Err(GraphError::ReferenceUnderflow {
                    node: old.to_string(),
                }
                .into());
            }
        }

        if let Some(old) = old {
            self.team_mut(old)?.num_learners_referencing -= 1;
        }
        if let Some(new) = action.team() {
            self.team_mut(new)?.num_learners_referencing += 1;
        }
        self.learner_mut(learner)?.action = action;
        Ok(())
    }

    // ============ Removal ============

    /// Remove a team no learner points at; its members lose one reference
    pub fn remove_team(&mut self, id: TeamId) -> Result<Team> {
        let team = self.team(id)?;
        if team.num_learners_referencing > 0 {
            return Err(GraphError::StillReferenced {
                node: id.to_string(),
                count: team.num_learners_referencing,
            }
            .into());
        }
        for learner in &team.learners {
            let count = self.learner(*learner)?.num_teams_referencing;
            if count == 0 {
                return Err(GraphError::ReferenceUnderflow {
                    node: learner.to_string(),
                }
                .into());
            }
        }

        let team = self.teams.remove(&id).ok_or(GraphError::UnknownTeam(id))?;
        for learner in &team.learners {
            self.learner_mut(*learner)?.num_teams_referencing -= 1;
        }
        debug!(team = %id, learners = team.learners.len(), "Removed team");
        Ok(team)
    }

    /// Remove a learner no team lists; its action edge is released
    pub fn remove_learner(&mut self, id: LearnerId) -> Result<Learner> {
        let learner = self.learner(id)?;
        if learner.num_teams_referencing > 0 {
            return Err(GraphError::StillReferenced {
                node: id.to_string(),
                count: learner.num_teams_referencing,
            }
            .into());
        }
        if let Some(target) = learner.action.team() {
            if self.team(target)?.num_learners_referencing == 0 {
                return Err(GraphError::ReferenceUnderflow {
                    node: target.to_string(),
                }
                .into());
            }
            self.team_mut(target)?.num_learners_referencing -= 1;
        }
        self.learners
            .remove(&id)
            .ok_or_else(|| GraphError::UnknownLearner(id).into())
    }

    /// Teams no learner points at
    pub fn unreferenced_teams(&self) -> Vec<TeamId> {
        self.teams
            .values()
            .filter(|t| t.num_learners_referencing == 0)
            .map(|t| t.id)
            .collect()
    }

    /// Learners no team lists
    pub fn unreferenced_learners(&self) -> Vec<LearnerId> {
        self.learners
            .values()
            .filter(|l| l.num_teams_referencing == 0)
            .map(|l| l.id)
            .collect()
    }

    /// Recount every edge and compare with the stored counts
    pub fn check_references(&self) -> Result<()> {
        let mut team_refs: BTreeMap<TeamId, u32> = BTreeMap::new();
        for learner in self.learners.values() {
            if let Some(target) = learner.action.team() {
                if !self.teams.contains_key(&target) {
                    return Err(GraphError::UnknownTeam(target).into());
                }
                *team_refs.entry(target).or_default() += 1;
            }
        }
        let mut learner_refs: BTreeMap<LearnerId, u32> = BTreeMap::new();
        for team in self.teams.values() {
            for learner in &team.learners {
                if !self.learners.contains_key(learner) {
                    return Err(GraphError::UnknownLearner(*learner).into());
                }
                *learner_refs.entry(*learner).or_default() += 1;
            }
        }

        for team in self.teams.values() {
            let actual = team_refs.get(&team.id).copied().unwrap_or(0);
            if actual != team.num_learners_referencing {
                return Err(GraphError::ReferenceMismatch {
                    node: team.id.to_string(),
                    recorded: team.num_learners_referencing,
                    actual,
                }
                .into());
            }
        }
        for learner in self.learners.values() {
            let actual = learner_refs.get(&learner.id).copied().unwrap_or(0);
            if actual != learner.num_teams_referencing {
                return Err(GraphError::ReferenceMismatch {
                    node: learner.id.to_string(),
                    recorded: learner.num_teams_referencing,
                    actual,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Store an agent's outcomes on its root team
    pub fn commit_outcomes(&mut self, team: TeamId, outcomes: &BTreeMap<String, f64>) -> Result<()> {
        let t = self.team_mut(team)?;
        for (task, score) in outcomes {
            t.outcomes.insert(task.clone(), *score);
        }
        Ok(())
    }

    /// Replace the id allocator and ranges, as when resuming a snapshot
    pub(crate) fn restore_state(&mut self, ids: IdAllocator, ranges: InstructionRanges) -> Result<()> {
        if ranges.max_length == 0 {
            return Err(ConfigError::ZeroSized("max program length").into());
        }
        self.ids = ids;
        self.ranges = ranges;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tpg_common::TpgError;

    fn graph() -> Graph {
        Graph::new(TpgConfig::default()).unwrap()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = TpgConfig::default();
        config.registers.count = 0;
        assert!(matches!(Graph::new(config), Err(TpgError::Config(_))));
    }

    #[test]
    fn test_team_action_counts_reference() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut g = graph();
        let target = g.add_team();
        g.add_learner(&mut rng, Action::Team(target)).unwrap();
        g.add_learner(&mut rng, Action::Team(target)).unwrap();
        assert_eq!(g.team(target).unwrap().num_learners_referencing(), 2);
        g.check_references().unwrap();
    }

    #[test]
    fn test_action_to_unknown_team_rejected() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut g = graph();
        let err = g.add_learner(&mut rng, Action::Team(TeamId(99))).unwrap_err();
        assert!(matches!(err, TpgError::Graph(GraphError::UnknownTeam(TeamId(99)))));
        assert_eq!(g.learner_count(), 0);
    }

    #[test]
    fn test_membership_counts() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut g = graph();
        let a = g.add_team();
        let b = g.add_team();
        let l = g.add_learner(&mut rng, Action::label(0)).unwrap();
        g.add_learner_to_team(a, l).unwrap();
        g.add_learner_to_team(b, l).unwrap();
        assert!(g.add_learner_to_team(a, l).is_err());
        assert_eq!(g.learner(l).unwrap().num_teams_referencing(), 2);

        g.remove_learner_from_team(a, l).unwrap();
        assert_eq!(g.learner(l).unwrap().num_teams_referencing(), 1);
        assert!(matches!(
            g.remove_learner_from_team(a, l),
            Err(TpgError::Graph(GraphError::NotMember { .. }))
        ));
        g.check_references().unwrap();
    }

    #[test]
    fn test_rewire_moves_reference() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut g = graph();
        let a = g.add_team();
        let b = g.add_team();
        let l = g.add_learner(&mut rng, Action::Team(a)).unwrap();

        g.rewire(l, Action::Team(b)).unwrap();
        assert_eq!(g.team(a).unwrap().num_learners_referencing(), 0);
        assert_eq!(g.team(b).unwrap().num_learners_referencing(), 1);

        g.rewire(l, Action::label(3)).unwrap();
        assert_eq!(g.team(b).unwrap().num_learners_referencing(), 0);
        g.check_references().unwrap();
    }

    #[test]
    fn test_rewire_to_missing_team_changes_nothing() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut g = graph();
        let a = g.add_team();
        let l = g.add_learner(&mut rng, Action::Team(a)).unwrap();
        assert!(g.rewire(l, Action::Team(TeamId(42))).is_err());
        assert_eq!(g.learner(l).unwrap().action(), &Action::Team(a));
        assert_eq!(g.team(a).unwrap().num_learners_referencing(), 1);
    }

    #[test]
    fn test_corrupted_count_detected() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut g = graph();
        let a = g.add_team();
        let l = g.add_learner(&mut rng, Action::Team(a)).unwrap();
        g.teams.get_mut(&a).unwrap().num_learners_referencing = 0;
        assert!(matches!(
            g.rewire(l, Action::label(0)),
            Err(TpgError::Graph(GraphError::ReferenceUnderflow { .. }))
        ));
        assert!(matches!(
            g.check_references(),
            Err(TpgError::Graph(GraphError::ReferenceMismatch { recorded: 0, actual: 1, .. }))
        ));
    }

    #[test]
    fn test_removal_requires_no_references() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut g = graph();
        let root = g.add_team();
        let child = g.add_team();
        let l = g.add_learner(&mut rng, Action::Team(child)).unwrap();
        g.add_learner_to_team(root, l).unwrap();

        assert!(g.remove_team(child).is_err());
        assert!(g.remove_learner(l).is_err());
        assert_eq!(g.unreferenced_teams(), vec![root]);

        g.remove_team(root).unwrap();
        assert_eq!(g.unreferenced_learners(), vec![l]);
        g.remove_learner(l).unwrap();
        assert_eq!(g.team(child).unwrap().num_learners_referencing(), 0);
        g.remove_team(child).unwrap();
        assert_eq!((g.team_count(), g.learner_count()), (0, 0));
    }

    #[test]
    fn test_initial_mode_drawn_when_vector_mode_enabled() {
        let mut rng = StdRng::seed_from_u64(9);
        let mut config = TpgConfig::default();
        config.addressing.vector_mode = true;
        let mut g = Graph::new(config).unwrap();
        for _ in 0..64 {
            g.add_learner(&mut rng, Action::label(0)).unwrap();
        }
        let vector = g
            .learners()
            .filter(|l| l.mode() == ExecutionMode::Vector)
            .count();
        assert!(vector > 0 && vector < 64);

        let mut scalar_only = graph();
        for _ in 0..16 {
            let l = scalar_only.add_learner(&mut rng, Action::label(0)).unwrap();
            assert_eq!(scalar_only.learner(l).unwrap().mode(), ExecutionMode::Scalar);
        }
    }

    #[test]
    fn test_clone_learner() {
        let mut rng = StdRng::seed_from_u64(8);
        let mut g = graph();
        let target = g.add_team();
        let parent = g.add_learner(&mut rng, Action::Team(target)).unwrap();
        let child = g.clone_learner(parent).unwrap();

        let (p, c) = (g.learner(parent).unwrap(), g.learner(child).unwrap());
        assert_ne!(p.program().id(), c.program().id());
        assert_eq!(p.program().instructions(), c.program().instructions());
        assert_eq!(p.share_group(), c.share_group());
        assert_eq!(p.addressing(), c.addressing());
        assert_eq!(c.num_teams_referencing(), 0);
        assert_eq!(g.team(target).unwrap().num_learners_referencing(), 2);
    }

    #[test]
    fn test_commit_outcomes() {
        let mut g = graph();
        let t = g.add_team();
        let mut outcomes = BTreeMap::new();
        outcomes.insert("task".to_string(), 0.75);
        g.commit_outcomes(t, &outcomes).unwrap();
        assert_eq!(g.team(t).unwrap().outcome("task"), Some(0.75));
    }
}
