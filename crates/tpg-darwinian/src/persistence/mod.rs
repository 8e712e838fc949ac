//! Population snapshots
//!
//! A snapshot captures everything needed to resume a population
//! deterministically: config, instruction ranges, the id allocator, every
//! team and learner, and optionally the agents evaluating it. Remembered
//! learner states are not persisted.
//!
//! ## File format
//!
//! ```text
//! bincode(SnapshotFile { checksum: hex(blake3(payload)), payload: bincode(Snapshot) })
//! ```

use std::fs::File;
use std::io::{BufReader, BufWriter};
use std::path::Path;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::info;

use tpg_common::{IdAllocator, Result, SnapshotError, TpgConfig};
use tpg_vm::InstructionRanges;

use crate::agent::{Agent, AgentRecord};
use crate::graph::{Graph, Learner, Team};

/// Current snapshot format version
pub const SNAPSHOT_VERSION: u32 = 1;

/// Serializable image of a [`Graph`]
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Snapshot {
    pub version: u32,
    pub saved_at: DateTime<Utc>,
    pub config: TpgConfig,
    pub ranges: InstructionRanges,
    pub ids: IdAllocator,
    pub teams: Vec<Team>,
    pub learners: Vec<Learner>,
    pub agents: Vec<AgentRecord>,
}

#[derive(Serialize, Deserialize)]
struct SnapshotFile {
    checksum: String,
    payload: Vec<u8>,
}

impl Snapshot {
    pub fn capture(graph: &Graph) -> Self {
        Self {
            version: SNAPSHOT_VERSION,
            saved_at: Utc::now(),
            config: graph.config.clone(),
            ranges: graph.ranges.clone(),
            ids: graph.ids.clone(),
            teams: graph.teams.values().cloned().collect(),
            learners: graph.learners.values().cloned().collect(),
            agents: Vec::new(),
        }
    }

    pub fn with_agents(mut self, agents: &[Agent]) -> Self {
        self.agents = agents.iter().map(Agent::record).collect();
        self
    }

    /// Rebuild the graph, checking every edge and reference count
    pub fn restore(self) -> Result<(Graph, Vec<AgentRecord>)> {
        if self.version != SNAPSHOT_VERSION {
            return Err(SnapshotError::UnsupportedVersion(self.version).into());
        }
        let mut graph = Graph::new(self.config)?;
        graph.restore_state(self.ids, self.ranges)?;
        graph.teams = self.teams.into_iter().map(|t| (t.id, t)).collect();
        graph.learners = self.learners.into_iter().map(|l| (l.id, l)).collect();

        for agent in &self.agents {
            if !graph.teams.contains_key(&agent.root) {
                return Err(SnapshotError::Dangling(agent.root.to_string()).into());
            }
        }
        graph.check_references()?;
        Ok((graph, self.agents))
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Write a checksummed binary snapshot
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let payload = bincode::serialize(self)?;
        let checksum = hex::encode(blake3::hash(&payload).as_bytes());
        let file = File::create(path.as_ref())?;
        let writer = BufWriter::new(file);
        bincode::serialize_into(
            writer,
            &SnapshotFile {
                checksum: checksum.clone(),
                payload,
            },
        )?;
        info!(
            path = %path.as_ref().display(),
            teams = self.teams.len(),
            learners = self.learners.len(),
            checksum = %checksum,
            "Saved snapshot"
        );
        Ok(())
    }

    /// Read a binary snapshot, rejecting it if the checksum does not match
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let file = File::open(path.as_ref())?;
        let reader = BufReader::new(file);
        let envelope: SnapshotFile = bincode::deserialize_from(reader)?;
        let actual = hex::encode(blake3::hash(&envelope.payload).as_bytes());
        if actual != envelope.checksum {
            return Err(SnapshotError::ChecksumMismatch {
                expected: envelope.checksum,
                actual,
            }
            .into());
        }
        let snapshot: Snapshot = bincode::deserialize(&envelope.payload)?;
        info!(
            path = %path.as_ref().display(),
            version = snapshot.version,
            saved_at = %snapshot.saved_at,
            "Loaded snapshot"
        );
        Ok(snapshot)
    }
}

impl Graph {
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        Snapshot::capture(self).save_to_file(path)
    }

    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let (graph, _) = Snapshot::load_from_file(path)?.restore()?;
        Ok(graph)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;
    use tpg_common::{Action, TeamId, TpgError};

    fn population() -> Graph {
        let mut rng = StdRng::seed_from_u64(17);
        let mut g = Graph::new(TpgConfig::default()).unwrap();
        let root = g.add_team();
        let child = g.add_team();
        let edge = g.add_learner(&mut rng, Action::Team(child)).unwrap();
        let leaf = g.add_learner(&mut rng, Action::label(2)).unwrap();
        g.add_learner_to_team(root, edge).unwrap();
        g.add_learner_to_team(root, leaf).unwrap();
        g.add_learner_to_team(child, leaf).unwrap();
        g
    }

    #[test]
    fn test_json_round_trip() {
        let g = population();
        let json = Snapshot::capture(&g).to_json().unwrap();
        let (restored, agents) = Snapshot::from_json(&json).unwrap().restore().unwrap();
        assert!(agents.is_empty());
        assert_eq!(restored.ids(), g.ids());
        assert_eq!(restored.team_ids(), g.team_ids());
        restored.check_references().unwrap();
    }

    #[test]
    fn test_version_checked() {
        let mut snapshot = Snapshot::capture(&population());
        snapshot.version = 99;
        assert!(matches!(
            snapshot.restore(),
            Err(TpgError::Snapshot(SnapshotError::UnsupportedVersion(99)))
        ));
    }

    #[test]
    fn test_inconsistent_counts_rejected() {
        let mut snapshot = Snapshot::capture(&population());
        for team in &mut snapshot.teams {
            team.num_learners_referencing += 1;
        }
        assert!(snapshot.restore().is_err());
    }

    #[test]
    fn test_dangling_agent_root() {
        let g = population();
        let mut snapshot = Snapshot::capture(&g);
        snapshot.agents.push(AgentRecord {
            root: TeamId(77),
            agent_num: 0,
            outcomes: Default::default(),
        });
        assert!(matches!(
            snapshot.restore(),
            Err(TpgError::Snapshot(SnapshotError::Dangling(_)))
        ));
    }
}
