//! Agent: one root team plus the shared bank its learners use
//!
//! The agent borrows the graph read-only to decide, so independent agents
//! over one graph may run in parallel. Recording decisions and committing
//! outcomes need the graph mutably.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use tpg_common::{AtomicAction, Observation, Result, TeamId, DEFAULT_TASK};
use tpg_vm::SharedBank;

use crate::graph::Graph;

/// Evaluation-time wrapper around a root team
#[derive(Debug, Clone)]
pub struct Agent {
    root: TeamId,
    agent_num: usize,
    shared: SharedBank,
    outcomes: BTreeMap<String, f64>,
}

/// Persisted part of an agent
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AgentRecord {
    pub root: TeamId,
    pub agent_num: usize,
    pub outcomes: BTreeMap<String, f64>,
}

impl Agent {
    /// Agent for `root`, starting from the outcomes the team already holds
    pub fn new(graph: &Graph, root: TeamId, agent_num: usize) -> Result<Self> {
        let outcomes = graph.team(root)?.outcomes().clone();
        let registers = &graph.config().registers;
        Ok(Self {
            root,
            agent_num,
            shared: SharedBank::new(registers.shared_groups, registers.shared_slots),
            outcomes,
        })
    }

    pub fn from_record(graph: &Graph, record: AgentRecord) -> Result<Self> {
        let mut agent = Self::new(graph, record.root, record.agent_num)?;
        agent.outcomes.extend(record.outcomes);
        Ok(agent)
    }

    pub fn record(&self) -> AgentRecord {
        AgentRecord {
            root: self.root,
            agent_num: self.agent_num,
            outcomes: self.outcomes.clone(),
        }
    }

    pub fn root(&self) -> TeamId {
        self.root
    }

    pub fn agent_num(&self) -> usize {
        self.agent_num
    }

    pub fn shared(&self) -> &SharedBank {
        &self.shared
    }

    /// Zero the shared bank before a new episode
    pub fn reset(&mut self) {
        self.shared.reset();
    }

    /// Decide on `input`. The bank carries over between calls until
    /// [`reset`](Self::reset).
    pub fn act(&mut self, graph: &Graph, input: &Observation) -> Result<AtomicAction> {
        graph.act(self.root, input, &mut self.shared)
    }

    /// Decide and let every learner that bid remember `input`
    pub fn act_recording(&mut self, graph: &mut Graph, input: &Observation) -> Result<AtomicAction> {
        graph.act_recording(self.root, input, &mut self.shared)
    }

    /// Record `score` for `task` (the default task when `None`)
    pub fn reward(&mut self, score: f64, task: Option<&str>) {
        let task = task.unwrap_or(DEFAULT_TASK);
        self.outcomes.insert(task.to_string(), score);
    }

    pub fn task_done(&self, task: &str) -> bool {
        self.outcomes.contains_key(task)
    }

    pub fn outcomes(&self) -> &BTreeMap<String, f64> {
        &self.outcomes
    }

    /// Write the recorded outcomes onto the root team
    pub fn commit(&self, graph: &mut Graph) -> Result<()> {
        graph.commit_outcomes(self.root, &self.outcomes)
    }
}
