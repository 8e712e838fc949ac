//! # TPG Common
//!
//! Shared types, errors, and configuration for tangled program graphs.
//!
//! ## Core Types
//!
//! - [`Observation`]: fixed-shape numeric input fed to learners
//! - [`Action`]: tagged learner action (atomic label, label vector, or team edge)
//! - [`IdAllocator`]: explicit id state for programs, learners, and teams
//! - [`TpgConfig`]: population-wide settings (ranges, registers, mutation rates)
//!
//! ## Errors
//!
//! - [`TpgError`]: unified error type, with [`GraphError`], [`ConfigError`]
//!   and [`SnapshotError`] for the domain-specific cases

pub mod config;
pub mod error;
pub mod types;

// Re-export commonly used types at crate root
pub use config::{
    AddressingKind, AddressingSettings, MutationSettings, ProgramSettings, RegisterSettings,
    TpgConfig,
};
pub use error::{ConfigError, GraphError, Result, SnapshotError, TpgError};
pub use types::{
    action::{Action, AtomicAction},
    ids::{IdAllocator, LearnerId, ProgramId, TeamId},
    observation::Observation,
};

/// TPG version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Number of distinct operations in the instruction set
pub const OPERATION_COUNT: u32 = 8;

/// Default private register count per learner
pub const DEFAULT_REGISTER_COUNT: usize = 8;

/// Default shared register groups per agent
pub const DEFAULT_SHARED_GROUPS: usize = 8;

/// Default shared register slots per group
pub const DEFAULT_SHARED_SLOTS: usize = 8;

/// Default number of observations a learner remembers
pub const DEFAULT_STATE_HISTORY: usize = 50;

/// Task name used when rewards are recorded without one
pub const DEFAULT_TASK: &str = "task";
