//! Team traversal
//!
//! A team marks itself visited, lets every eligible learner bid, and follows
//! the winner's action. A learner is eligible when its action is atomic or
//! points at a team not yet visited in this decision. The highest bid wins;
//! on equal bids the learner listed first wins.

use std::collections::HashSet;

use tracing::trace;

use tpg_common::{Action, AtomicAction, GraphError, LearnerId, Observation, Result, TeamId};
use tpg_vm::SharedBank;

use super::Graph;

impl Graph {
    /// Decision of the sub-graph rooted at `team`
    pub fn act(&self, team: TeamId, input: &Observation, shared: &mut SharedBank) -> Result<AtomicAction> {
        let mut visited = HashSet::new();
        self.team_act(team, input, shared, &mut visited)
    }

    /// Decision of `team` given the teams already visited in this decision
    pub fn team_act(
        &self,
        team: TeamId,
        input: &Observation,
        shared: &mut SharedBank,
        visited: &mut HashSet<TeamId>,
    ) -> Result<AtomicAction> {
        self.traverse(team, input, shared, visited, None)
    }

    /// Like [`act`](Self::act), and every learner that bid remembers `input`
    pub fn act_recording(
        &mut self,
        team: TeamId,
        input: &Observation,
        shared: &mut SharedBank,
    ) -> Result<AtomicAction> {
        let mut visited = HashSet::new();
        let mut bidders = Vec::new();
        let action = self.traverse(team, input, shared, &mut visited, Some(&mut bidders))?;

        let limit = self.config.state_history;
        for id in bidders {
            self.learner_mut(id)?.save_state(input, limit);
        }
        Ok(action)
    }

    /// Resolve a learner's action: atomic directly, team edges by traversal
    pub fn get_action(
        &self,
        learner: LearnerId,
        input: &Observation,
        shared: &mut SharedBank,
        visited: &mut HashSet<TeamId>,
    ) -> Result<AtomicAction> {
        match &self.learner(learner)?.action {
            Action::Atomic(atomic) => Ok(atomic.clone()),
            Action::Team(target) => self.team_act(*target, input, shared, visited),
        }
    }

    fn traverse(
        &self,
        team: TeamId,
        input: &Observation,
        shared: &mut SharedBank,
        visited: &mut HashSet<TeamId>,
        mut bidders: Option<&mut Vec<LearnerId>>,
    ) -> Result<AtomicAction> {
        visited.insert(team);
        let node = self.team(team)?;

        let mut best: Option<(LearnerId, f64)> = None;
        for &id in &node.learners {
            let learner = self.learner(id)?;
            let eligible = match learner.action {
                Action::Atomic(_) => true,
                Action::Team(target) => !visited.contains(&target),
            };
            if !eligible {
                continue;
            }
            let bid = learner.bid(input, shared);
            if let Some(list) = bidders.as_deref_mut() {
                list.push(id);
            }
            if best.map_or(true, |(_, top)| bid > top) {
                best = Some((id, bid));
            }
        }

        let (winner, bid) = best.ok_or(GraphError::NoEligibleLearner(team))?;
        trace!(team = %team, learner = %winner, bid, "Team decided");

        match &self.learner(winner)?.action {
            Action::Atomic(atomic) => Ok(atomic.clone()),
            Action::Team(target) => self.traverse(*target, input, shared, visited, bidders),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tpg_common::{ProgramId, TpgConfig, TpgError};
    use tpg_vm::{Addressing, Instruction, Program};

    /// Learner whose bid is input element `src`
    fn reader(g: &mut Graph, src: u32, action: Action) -> LearnerId {
        let program = Program::new(ProgramId(src as u64), vec![Instruction::new(1, 0, 0, 0, 0, src)]).unwrap();
        g.add_learner_with(program, action, Addressing::Full, 0).unwrap()
    }

    fn input(values: &[f64]) -> Observation {
        Observation::flat(values.to_vec()).unwrap()
    }

    #[test]
    fn test_highest_bid_wins() {
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let root = g.add_team();
        let a = reader(&mut g, 0, Action::label(10));
        let b = reader(&mut g, 1, Action::label(20));
        g.add_learner_to_team(root, a).unwrap();
        g.add_learner_to_team(root, b).unwrap();

        let mut bank = SharedBank::new(1, 1);
        assert_eq!(g.act(root, &input(&[1.0, 2.0]), &mut bank).unwrap(), AtomicAction::Label(20));
        assert_eq!(g.act(root, &input(&[3.0, 2.0]), &mut bank).unwrap(), AtomicAction::Label(10));
    }

    #[test]
    fn test_first_learner_wins_ties() {
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let root = g.add_team();
        let a = reader(&mut g, 0, Action::label(1));
        let b = reader(&mut g, 0, Action::label(2));
        g.add_learner_to_team(root, a).unwrap();
        g.add_learner_to_team(root, b).unwrap();
        let mut bank = SharedBank::new(1, 1);
        assert_eq!(g.act(root, &input(&[5.0]), &mut bank).unwrap(), AtomicAction::Label(1));
    }

    #[test]
    fn test_follows_team_edge() {
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let root = g.add_team();
        let child = g.add_team();
        let edge = reader(&mut g, 0, Action::Team(child));
        let low = reader(&mut g, 1, Action::label(1));
        let leaf = reader(&mut g, 0, Action::label(7));
        g.add_learner_to_team(root, edge).unwrap();
        g.add_learner_to_team(root, low).unwrap();
        g.add_learner_to_team(child, leaf).unwrap();

        let mut bank = SharedBank::new(1, 1);
        assert_eq!(g.act(root, &input(&[9.0, 0.0]), &mut bank).unwrap(), AtomicAction::Label(7));
    }

    #[test]
    fn test_visited_team_not_reentered() {
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let a = g.add_team();
        let b = g.add_team();
        // a -> b -> a cycle; the back edge out of b bids highest
        let to_b = reader(&mut g, 0, Action::Team(b));
        let back = reader(&mut g, 0, Action::Team(a));
        let exit = reader(&mut g, 1, Action::label(3));
        g.add_learner_to_team(a, to_b).unwrap();
        g.add_learner_to_team(b, back).unwrap();
        g.add_learner_to_team(b, exit).unwrap();

        let mut bank = SharedBank::new(1, 1);
        assert_eq!(g.act(a, &input(&[9.0, 1.0]), &mut bank).unwrap(), AtomicAction::Label(3));
    }

    #[test]
    fn test_no_eligible_learner() {
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let empty = g.add_team();
        let mut bank = SharedBank::new(1, 1);
        assert!(matches!(
            g.act(empty, &input(&[1.0]), &mut bank),
            Err(TpgError::Graph(GraphError::NoEligibleLearner(_)))
        ));
    }

    #[test]
    fn test_recording_saves_bidders_only() {
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let root = g.add_team();
        let other = g.add_team();
        let a = reader(&mut g, 0, Action::label(1));
        let unused = reader(&mut g, 0, Action::label(2));
        g.add_learner_to_team(root, a).unwrap();
        g.add_learner_to_team(other, unused).unwrap();

        let mut bank = SharedBank::new(1, 1);
        g.act_recording(root, &input(&[1.0]), &mut bank).unwrap();
        assert_eq!(g.learner(a).unwrap().states().count(), 1);
        assert_eq!(g.learner(unused).unwrap().states().count(), 0);
    }

    #[test]
    fn test_get_action() {
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let child = g.add_team();
        let leaf = reader(&mut g, 0, Action::label(4));
        g.add_learner_to_team(child, leaf).unwrap();
        let edge = reader(&mut g, 0, Action::Team(child));

        let mut bank = SharedBank::new(1, 1);
        let mut visited = HashSet::new();
        assert_eq!(
            g.get_action(edge, &input(&[1.0]), &mut bank, &mut visited).unwrap(),
            AtomicAction::Label(4)
        );
        assert!(visited.contains(&child));
    }
}
