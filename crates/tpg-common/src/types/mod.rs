//! Core data types shared across the TPG crates

pub mod action;
pub mod ids;
pub mod observation;
