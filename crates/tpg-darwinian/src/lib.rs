//! # Darwinian
//!
//! Populations of learners and teams for tangled program graphs.
//!
//! ## Graph
//!
//! ```text
//! Team --member--> Learner --action--> Team | atomic
//! ```
//!
//! Teams and learners live in one arena ([`Graph`]) keyed by integer ids.
//! Both edge kinds are reference counted; a node is only removable once
//! nothing points at it.
//!
//! ## Decisions
//!
//! An [`Agent`] owns a shared register bank and a root team. A decision asks
//! every eligible learner of the team for a bid, follows the winner's action,
//! and stops at the first atomic action. A visited set keeps a decision from
//! entering a team twice.
//!
//! ## Evolution
//!
//! [`Graph::mutate_learner`] changes a learner's program, execution mode,
//! action edge, share group, or addressing, retrying until one of them
//! changed. Mutation is a single-writer operation between evaluations.

pub mod agent;
pub mod graph;
pub mod mutation;
pub mod persistence;

pub use agent::{Agent, AgentRecord};
pub use graph::{Graph, Learner, Team};
pub use mutation::{MutationReport, MutationScope};
pub use persistence::{Snapshot, SNAPSHOT_VERSION};
