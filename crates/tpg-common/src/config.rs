//! Population configuration
//!
//! Settings that the register machine, the addressing strategies and the
//! mutation operators share. A config is persisted with every snapshot so a
//! resumed population samples from the same ranges.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::ConfigError;

/// Population-wide settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TpgConfig {
    /// Instruction sampling ranges
    pub program: ProgramSettings,
    /// Register file and shared bank sizes
    pub registers: RegisterSettings,
    /// Observation addressing
    pub addressing: AddressingSettings,
    /// Mutation rates and retry budgets
    pub mutation: MutationSettings,
    /// Observations each learner remembers for uniqueness checks
    pub state_history: usize,
}

impl Default for TpgConfig {
    fn default() -> Self {
        Self {
            program: ProgramSettings::default(),
            registers: RegisterSettings::default(),
            addressing: AddressingSettings::default(),
            mutation: MutationSettings::default(),
            state_history: crate::DEFAULT_STATE_HISTORY,
        }
    }
}

impl TpgConfig {
    /// Load configuration from a `.env` file and `TPG_*` environment variables
    pub fn load() -> Result<Self, ConfigError> {
        // Try to load .env file
        let _ = dotenvy::dotenv();

        let mut cfg = Self::default();

        // Program settings
        env_override("TPG_DESTINATION_RANGE", &mut cfg.program.destination_range)?;
        env_override("TPG_SOURCE_RANGE", &mut cfg.program.source_range)?;
        env_override("TPG_MAX_PROGRAM_LENGTH", &mut cfg.program.max_program_length)?;

        // Register settings
        env_override("TPG_REGISTERS", &mut cfg.registers.count)?;
        env_override("TPG_SHARED_GROUPS", &mut cfg.registers.shared_groups)?;
        env_override("TPG_SHARED_SLOTS", &mut cfg.registers.shared_slots)?;

        // Addressing settings
        env_override("TPG_ADDRESSING", &mut cfg.addressing.kind)?;
        env_override("TPG_KERNEL_SIZE", &mut cfg.addressing.kernel_size)?;
        env_override("TPG_KERNEL_POINTS", &mut cfg.addressing.kernel_points)?;
        env_override("TPG_KERNEL_STEP", &mut cfg.addressing.step_size)?;
        env_override("TPG_VECTOR_MODE", &mut cfg.addressing.vector_mode)?;
        if let Ok(val) = std::env::var("TPG_SOURCE_DIMS") {
            cfg.addressing.source_dims = parse_dims(&val)?;
        }

        // Mutation settings
        env_override("TPG_P_MUT_PROG", &mut cfg.mutation.program)?;
        env_override("TPG_P_MUT_ACT", &mut cfg.mutation.action)?;
        env_override("TPG_P_ACT_ATOM", &mut cfg.mutation.action_atomic)?;
        env_override("TPG_P_DEL_INST", &mut cfg.mutation.delete_instruction)?;
        env_override("TPG_P_ADD_INST", &mut cfg.mutation.add_instruction)?;
        env_override("TPG_P_SWP_INST", &mut cfg.mutation.swap_instruction)?;
        env_override("TPG_P_MUT_INST", &mut cfg.mutation.mutate_instruction)?;
        env_override(
            "TPG_UNIQUE_PROG_THRESH",
            &mut cfg.mutation.unique_program_threshold,
        )?;

        env_override("TPG_STATE_HISTORY", &mut cfg.state_history)?;

        cfg.validate()?;
        tracing::debug!(config = ?cfg, "Loaded configuration");
        Ok(cfg)
    }

    /// Reject settings the register machine or mutation loops cannot honour
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.program.destination_range == 0 {
            return Err(ConfigError::ZeroSized("destination range"));
        }
        if self.program.source_range == 0 {
            return Err(ConfigError::ZeroSized("source range"));
        }
        if self.program.max_program_length == 0 {
            return Err(ConfigError::ZeroSized("max program length"));
        }
        if self.registers.count == 0 {
            return Err(ConfigError::ZeroSized("register count"));
        }
        if self.registers.shared_groups == 0 {
            return Err(ConfigError::ZeroSized("shared register groups"));
        }
        if self.registers.shared_slots == 0 {
            return Err(ConfigError::ZeroSized("shared register slots"));
        }
        if self.addressing.source_dims.is_empty() || self.addressing.source_dims.contains(&0) {
            return Err(ConfigError::ZeroSized("source dimensions"));
        }
        if self.addressing.kernel_size == 0 {
            return Err(ConfigError::ZeroSized("kernel size"));
        }
        if self.addressing.step_size == 0 {
            return Err(ConfigError::ZeroSized("kernel step size"));
        }
        if self.addressing.kind == AddressingKind::MultiWindow && self.addressing.kernel_points < 2
        {
            return Err(ConfigError::TooFewKernelPoints(self.addressing.kernel_points));
        }
        self.mutation.validate()
    }
}

/// Instruction field ranges
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramSettings {
    /// Destination index range (usually the register count)
    pub destination_range: u32,
    /// Source index range (usually the flattened input length)
    pub source_range: u32,
    /// Longest program created at random
    pub max_program_length: usize,
}

impl Default for ProgramSettings {
    fn default() -> Self {
        Self {
            destination_range: 8,
            source_range: 784,
            max_program_length: 128,
        }
    }
}

/// Register file and shared bank sizes
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegisterSettings {
    /// Private registers per learner
    pub count: usize,
    /// Shared register groups per agent
    pub shared_groups: usize,
    /// Slots in each shared group
    pub shared_slots: usize,
}

impl Default for RegisterSettings {
    fn default() -> Self {
        Self {
            count: crate::DEFAULT_REGISTER_COUNT,
            shared_groups: crate::DEFAULT_SHARED_GROUPS,
            shared_slots: crate::DEFAULT_SHARED_SLOTS,
        }
    }
}

/// Which slice of the observation a new learner sees
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressingKind {
    Full,
    Window,
    MultiWindow,
}

impl FromStr for AddressingKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "full" => Ok(AddressingKind::Full),
            "window" => Ok(AddressingKind::Window),
            "multi_window" | "multi-window" => Ok(AddressingKind::MultiWindow),
            other => Err(format!("unknown addressing kind {}", other)),
        }
    }
}

/// Observation addressing settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AddressingSettings {
    /// Strategy for newly created learners
    pub kind: AddressingKind,
    /// Shape of the observations the population sees
    pub source_dims: Vec<usize>,
    /// Window edge length per axis
    pub kernel_size: usize,
    /// Anchors per multi-window learner
    pub kernel_points: usize,
    /// Largest per-axis anchor step of a multi-window mutation
    pub step_size: usize,
    /// Whether learners may run in vector mode
    pub vector_mode: bool,
}

impl Default for AddressingSettings {
    fn default() -> Self {
        Self {
            kind: AddressingKind::Full,
            source_dims: vec![28, 28],
            kernel_size: 3,
            kernel_points: 2,
            step_size: 1,
            vector_mode: false,
        }
    }
}

/// Mutation probabilities and retry budgets
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MutationSettings {
    /// Mutate a learner's program (also gates the execution mode toggle)
    pub program: f64,
    /// Additional program mutation passes
    pub program_repeat: f64,
    /// Mutate a learner's action (also gates share group and addressing)
    pub action: f64,
    /// New action is atomic rather than a team edge
    pub action_atomic: f64,
    pub delete_instruction: f64,
    pub add_instruction: f64,
    pub swap_instruction: f64,
    pub mutate_instruction: f64,
    /// Replace a multi-label action wholesale instead of perturbing it
    pub swap_multi_action: f64,
    /// Keep perturbing multi-label coordinates
    pub change_multi_action: f64,
    /// Standard deviation of multi-label perturbation
    pub multi_action_noise: f64,
    /// Minimum output distance to every corpus entry
    pub unique_program_threshold: f64,
    /// Uniqueness search budget
    pub max_unique_attempts: usize,
    /// Bound on every retry-until-changed loop
    pub max_change_attempts: usize,
}

impl Default for MutationSettings {
    fn default() -> Self {
        Self {
            program: 0.66,
            program_repeat: 0.66,
            action: 0.33,
            action_atomic: 0.5,
            delete_instruction: 0.5,
            add_instruction: 0.5,
            swap_instruction: 1.0,
            mutate_instruction: 1.0,
            swap_multi_action: 0.66,
            change_multi_action: 0.40,
            multi_action_noise: 0.15,
            unique_program_threshold: 0.0,
            max_unique_attempts: 100,
            max_change_attempts: 1000,
        }
    }
}

impl MutationSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        let probabilities = [
            ("program", self.program),
            ("program_repeat", self.program_repeat),
            ("action", self.action),
            ("action_atomic", self.action_atomic),
            ("delete_instruction", self.delete_instruction),
            ("add_instruction", self.add_instruction),
            ("swap_instruction", self.swap_instruction),
            ("mutate_instruction", self.mutate_instruction),
            ("swap_multi_action", self.swap_multi_action),
            ("change_multi_action", self.change_multi_action),
        ];
        for (name, value) in probabilities {
            if !(0.0..=1.0).contains(&value) {
                return Err(ConfigError::InvalidProbability { name, value });
            }
        }
        if !(self.multi_action_noise >= 0.0 && self.multi_action_noise.is_finite()) {
            return Err(ConfigError::InvalidValue {
                key: "multi_action_noise".to_string(),
                value: self.multi_action_noise.to_string(),
            });
        }
        if self.max_change_attempts == 0 {
            return Err(ConfigError::ZeroSized("max change attempts"));
        }
        if self.program == 0.0 && self.action == 0.0 {
            return Err(ConfigError::NoMutationPossible);
        }
        if self.program > 0.0
            && self.delete_instruction == 0.0
            && self.add_instruction == 0.0
            && self.swap_instruction == 0.0
            && self.mutate_instruction == 0.0
        {
            return Err(ConfigError::NoMutationPossible);
        }
        Ok(())
    }
}

fn env_override<T: FromStr>(key: &str, field: &mut T) -> Result<(), ConfigError> {
    if let Ok(val) = std::env::var(key) {
        *field = val.trim().parse().map_err(|_| ConfigError::InvalidValue {
            key: key.to_string(),
            value: val.clone(),
        })?;
    }
    Ok(())
}

fn parse_dims(val: &str) -> Result<Vec<usize>, ConfigError> {
    val.split(',')
        .map(|part| {
            part.trim().parse().map_err(|_| ConfigError::InvalidValue {
                key: "TPG_SOURCE_DIMS".to_string(),
                value: val.to_string(),
            })
        })
        .collect()
}
