//! Action-edge mutation
//!
//! With probability `action_atomic` the learner gets an atomic action, else
//! an edge to a team that is neither its current target nor its parent.
//! Single-label pools pick any other label. Vector pools either replace the
//! vector with a pool entry or nudge coordinates with Gaussian noise, clamped
//! to [0, 1].

use rand::seq::SliceRandom;
use rand::Rng;
use rand_distr::{Distribution, Normal};

use tpg_common::{Action, AtomicAction, LearnerId, MutationSettings, Result, TeamId};
use tpg_vm::rng::flip;

use crate::graph::Graph;

impl Graph {
    /// Pick a new action for `learner` and rewire to it.
    ///
    /// Returns whether the action changed. When no team qualifies the
    /// learner falls back to an atomic action.
    pub fn mutate_action<R: Rng + ?Sized>(
        &mut self,
        rng: &mut R,
        learner: LearnerId,
        parent: Option<TeamId>,
        atomics: &[AtomicAction],
    ) -> Result<bool> {
        let current = self.learner(learner)?.action.clone();
        let settings = &self.config.mutation;

        let team_candidates: Vec<TeamId> = self
            .teams
            .keys()
            .copied()
            .filter(|&t| Some(t) != current.team() && Some(t) != parent)
            .collect();

        let proposal = if flip(rng, settings.action_atomic) || team_candidates.is_empty() {
            propose_atomic(rng, &current, atomics, settings).map(Action::Atomic)
        } else {
            team_candidates.choose(rng).map(|&t| Action::Team(t))
        };

        match proposal {
            Some(action) if action != current => {
                self.rewire(learner, action)?;
                Ok(true)
            }
            _ => Ok(false),
        }
    }
}

fn propose_atomic<R: Rng + ?Sized>(
    rng: &mut R,
    current: &Action,
    atomics: &[AtomicAction],
    settings: &MutationSettings,
) -> Option<AtomicAction> {
    let multi_label = !atomics.is_empty()
        && atomics
            .iter()
            .all(|a| matches!(a, AtomicAction::Vector(_)));
    if !multi_label {
        let others: Vec<&AtomicAction> = atomics
            .iter()
            .filter(|a| !matches!(current, Action::Atomic(c) if c == *a))
            .collect();
        return others.choose(rng).map(|a| (*a).clone());
    }

    let swap = flip(rng, settings.swap_multi_action);
    let mut values = match current {
        Action::Atomic(AtomicAction::Vector(values)) if !swap => values.clone(),
        _ => match atomics.choose(rng) {
            Some(AtomicAction::Vector(values)) => values.clone(),
            _ => return None,
        },
    };

    if (!swap || flip(rng, settings.change_multi_action)) && !values.is_empty() {
        if let Ok(noise) = Normal::new(0.0, settings.multi_action_noise) {
            loop {
                let index = rng.gen_range(0..values.len());
                values[index] = (values[index] + noise.sample(rng)).clamp(0.0, 1.0);
                if !flip(rng, settings.change_multi_action) {
                    break;
                }
            }
        }
    }
    Some(AtomicAction::Vector(values))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tpg_common::TpgConfig;

    fn graph_with(settings: MutationSettings) -> Graph {
        let config = TpgConfig {
            mutation: settings,
            ..TpgConfig::default()
        };
        Graph::new(config).unwrap()
    }

    fn labels(n: i64) -> Vec<AtomicAction> {
        (0..n).map(AtomicAction::Label).collect()
    }

    #[test]
    fn test_atomic_excludes_current_label() {
        let mut rng = StdRng::seed_from_u64(1);
        let mut g = graph_with(MutationSettings {
            action_atomic: 1.0,
            ..MutationSettings::default()
        });
        let l = g.add_learner(&mut rng, Action::label(0)).unwrap();
        for _ in 0..50 {
            let before = g.learner(l).unwrap().action().clone();
            assert!(g.mutate_action(&mut rng, l, None, &labels(3)).unwrap());
            assert_ne!(g.learner(l).unwrap().action(), &before);
        }
    }

    #[test]
    fn test_single_label_pool_cannot_change() {
        let mut rng = StdRng::seed_from_u64(2);
        let mut g = graph_with(MutationSettings {
            action_atomic: 1.0,
            ..MutationSettings::default()
        });
        let l = g.add_learner(&mut rng, Action::label(0)).unwrap();
        assert!(!g.mutate_action(&mut rng, l, None, &labels(1)).unwrap());
    }

    #[test]
    fn test_team_edge_excludes_parent_and_current() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut g = graph_with(MutationSettings {
            action_atomic: 0.0,
            ..MutationSettings::default()
        });
        let parent = g.add_team();
        let a = g.add_team();
        let b = g.add_team();
        let l = g.add_learner(&mut rng, Action::Team(a)).unwrap();
        g.add_learner_to_team(parent, l).unwrap();

        assert!(g.mutate_action(&mut rng, l, Some(parent), &labels(2)).unwrap());
        assert_eq!(g.learner(l).unwrap().action(), &Action::Team(b));
        assert_eq!(g.team(a).unwrap().num_learners_referencing(), 0);
        assert_eq!(g.team(b).unwrap().num_learners_referencing(), 1);
        g.check_references().unwrap();
    }

    #[test]
    fn test_no_team_candidate_falls_back_to_atomic() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut g = graph_with(MutationSettings {
            action_atomic: 0.0,
            ..MutationSettings::default()
        });
        let parent = g.add_team();
        let l = g.add_learner(&mut rng, Action::label(1)).unwrap();
        assert!(g.mutate_action(&mut rng, l, Some(parent), &labels(2)).unwrap());
        assert_eq!(g.learner(l).unwrap().action(), &Action::label(0));
    }

    #[test]
    fn test_vector_actions_stay_in_unit_range() {
        let mut rng = StdRng::seed_from_u64(5);
        let mut g = graph_with(MutationSettings {
            action_atomic: 1.0,
            swap_multi_action: 0.0,
            change_multi_action: 0.9,
            multi_action_noise: 2.0,
            ..MutationSettings::default()
        });
        let pool = vec![
            AtomicAction::Vector(vec![0.0, 1.0, 0.5]),
            AtomicAction::Vector(vec![1.0, 0.0, 0.5]),
        ];
        let l = g
            .add_learner(&mut rng, Action::vector(vec![0.5, 0.5, 0.5]))
            .unwrap();
        for _ in 0..100 {
            g.mutate_action(&mut rng, l, None, &pool).unwrap();
            match g.learner(l).unwrap().action() {
                Action::Atomic(AtomicAction::Vector(v)) => {
                    assert_eq!(v.len(), 3);
                    assert!(v.iter().all(|x| (0.0..=1.0).contains(x)));
                }
                other => panic!("unexpected action {:?}", other),
            }
        }
    }

    #[test]
    fn test_vector_swap_takes_pool_entry() {
        let mut rng = StdRng::seed_from_u64(6);
        let mut g = graph_with(MutationSettings {
            action_atomic: 1.0,
            swap_multi_action: 1.0,
            change_multi_action: 0.0,
            ..MutationSettings::default()
        });
        let pool = vec![AtomicAction::Vector(vec![0.25, 0.75])];
        let l = g.add_learner(&mut rng, Action::label(0)).unwrap();
        assert!(g.mutate_action(&mut rng, l, None, &pool).unwrap());
        assert_eq!(g.learner(l).unwrap().action(), &Action::vector(vec![0.25, 0.75]));
    }
}
