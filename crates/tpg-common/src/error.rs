//! Error types for the TPG system
//!
//! Arithmetic and addressing hazards inside the register machine are designed
//! out and never surface here. What remains is construction-time validation,
//! graph bookkeeping, and persistence.

use thiserror::Error;

use crate::types::ids::{LearnerId, TeamId};

/// Result type alias using TpgError
pub type Result<T> = std::result::Result<T, TpgError>;

/// Unified error type for TPG operations
#[derive(Debug, Error)]
pub enum TpgError {
    // Observation construction
    #[error("Invalid observation: {0}")]
    InvalidObservation(String),

    // Program construction
    #[error("Program must hold at least one instruction")]
    EmptyProgram,

    // Graph errors
    #[error("Graph error: {0}")]
    Graph(#[from] GraphError),

    // Configuration errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    // Snapshot errors
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] SnapshotError),

    // Serialization errors
    #[error("Serialization error: {0}")]
    Serialization(String),

    // Storage errors
    #[error("Storage error: {0}")]
    Storage(String),
}

/// Population graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Team not found: {0}")]
    UnknownTeam(TeamId),

    #[error("Learner not found: {0}")]
    UnknownLearner(LearnerId),

    /// A reference count would drop below zero. This is an invariant
    /// violation, never an input error.
    #[error("Reference count underflow on {node}")]
    ReferenceUnderflow { node: String },

    #[error("Reference count mismatch on {node}: recorded {recorded}, actual {actual}")]
    ReferenceMismatch {
        node: String,
        recorded: u32,
        actual: u32,
    },

    #[error("Team {0} has no eligible learner")]
    NoEligibleLearner(TeamId),

    #[error("{node} is still referenced {count} time(s)")]
    StillReferenced { node: String, count: u32 },

    #[error("Learner {learner} already belongs to team {team}")]
    AlreadyMember { team: TeamId, learner: LearnerId },

    #[error("Learner {learner} is not a member of team {team}")]
    NotMember { team: TeamId, learner: LearnerId },
}

/// Configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Probability {name} out of range: {value}")]
    InvalidProbability { name: &'static str, value: f64 },

    #[error("{0} must be at least 1")]
    ZeroSized(&'static str),

    #[error("Multi-window addressing needs at least 2 points, got {0}")]
    TooFewKernelPoints(usize),

    #[error("No mutation can fire with the configured rates")]
    NoMutationPossible,

    #[error("Invalid value for {key}: {value}")]
    InvalidValue { key: String, value: String },
}

/// Snapshot persistence errors
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("Checksum mismatch: expected {expected}, got {actual}")]
    ChecksumMismatch { expected: String, actual: String },

    #[error("Unsupported snapshot version: {0}")]
    UnsupportedVersion(u32),

    #[error("Snapshot references missing node: {0}")]
    Dangling(String),
}

impl From<serde_json::Error> for TpgError {
    fn from(err: serde_json::Error) -> Self {
        TpgError::Serialization(err.to_string())
    }
}

impl From<bincode::Error> for TpgError {
    fn from(err: bincode::Error) -> Self {
        TpgError::Serialization(err.to_string())
    }
}

impl From<std::io::Error> for TpgError {
    fn from(err: std::io::Error) -> Self {
        TpgError::Storage(err.to_string())
    }
}
