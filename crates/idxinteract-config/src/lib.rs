//! Configuration system for idxinteract.
//!
//! Load pair-search configuration from TOML or YAML files to control the
//! interaction threshold, parallelism, solve mode and solver limits without
//! code changes.
//!
//! # Examples
//!
//! Load configuration from TOML string:
//!
//! ```
//! use idxinteract_config::{InteractionConfig, SolveMode, ThreadCount};
//!
//! let config = InteractionConfig::from_toml_str(r#"
//!     delta = 0.25
//!     solve_mode = "batched"
//!     thread_count = { specific = 4 }
//!
//!     [solver]
//!     node_limit = 50000
//! "#).unwrap();
//!
//! assert_eq!(config.delta, 0.25);
//! assert_eq!(config.solve_mode, SolveMode::Batched);
//! assert_eq!(config.thread_count, ThreadCount::Specific(4));
//! assert_eq!(config.solver.node_limit, Some(50_000));
//! ```
//!
//! Use default config when file is missing:
//!
//! ```
//! use idxinteract_config::InteractionConfig;
//!
//! let config = InteractionConfig::load("interaction.toml").unwrap_or_default();
//! // Proceeds with defaults if file doesn't exist
//! ```

use std::fmt;
use std::path::Path;

use idxinteract_core::InteractionError;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Default interaction threshold.
pub const DEFAULT_DELTA: f64 = 0.1;

/// Configuration error
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    Toml(#[from] toml::de::Error),

    #[error("YAML parse error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

impl From<ConfigError> for InteractionError {
    fn from(err: ConfigError) -> Self {
        InteractionError::Config(err.to_string())
    }
}

/// Main pair-search configuration.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct InteractionConfig {
    /// Interaction threshold: a pair interacts when its degree reaches this.
    #[serde(default = "default_delta")]
    pub delta: f64,

    /// Number of worker threads for pair-level parallelism.
    #[serde(default)]
    pub thread_count: ThreadCount,

    /// Per-statement programs or one batched program per pair.
    #[serde(default)]
    pub solve_mode: SolveMode,

    /// Whether to annotate interacting pairs with their degree of interaction.
    #[serde(default)]
    pub measure_degree: bool,

    /// Maximum number of re-solves spent refining a degree of interaction.
    #[serde(default = "default_refinement_limit")]
    pub degree_refinement_limit: usize,

    /// Retries with a fresh model after a solver error.
    #[serde(default = "default_retries")]
    pub solver_retries: u32,

    /// Solver backend settings.
    #[serde(default)]
    pub solver: SolverSettings,
}

fn default_delta() -> f64 {
    DEFAULT_DELTA
}

fn default_refinement_limit() -> usize {
    32
}

fn default_retries() -> u32 {
    1
}

impl Default for InteractionConfig {
    fn default() -> Self {
        Self {
            delta: DEFAULT_DELTA,
            thread_count: ThreadCount::default(),
            solve_mode: SolveMode::default(),
            measure_degree: false,
            degree_refinement_limit: default_refinement_limit(),
            solver_retries: default_retries(),
            solver: SolverSettings::default(),
        }
    }
}

impl InteractionConfig {
    /// Creates a new default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Loads configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns error if file doesn't exist, contains invalid TOML, or
    /// fails validation.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        Self::from_toml_file(path)
    }

    /// Loads configuration from a TOML file.
    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_toml_str(&contents)
    }

    /// Parses configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Loads configuration from a YAML file.
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&contents)
    }

    /// Parses configuration from a YAML string.
    pub fn from_yaml_str(s: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_yaml::from_str(s)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks value ranges that serde cannot express.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if !self.delta.is_finite() || self.delta < 0.0 {
            return Err(ConfigError::Invalid(format!(
                "delta must be a non-negative finite number, got {}",
                self.delta
            )));
        }
        if !(self.solver.tolerance > 0.0 && self.solver.tolerance < 1.0) {
            return Err(ConfigError::Invalid(format!(
                "solver tolerance must lie in (0, 1), got {}",
                self.solver.tolerance
            )));
        }
        if let ThreadCount::Specific(0) = self.thread_count {
            return Err(ConfigError::Invalid(
                "thread_count must be at least 1".to_string(),
            ));
        }
        Ok(())
    }

    /// Sets the interaction threshold.
    pub fn with_delta(mut self, delta: f64) -> Self {
        self.delta = delta;
        self
    }

    /// Sets the worker thread count.
    pub fn with_thread_count(mut self, thread_count: ThreadCount) -> Self {
        self.thread_count = thread_count;
        self
    }

    /// Sets the solve mode.
    pub fn with_solve_mode(mut self, mode: SolveMode) -> Self {
        self.solve_mode = mode;
        self
    }

    /// Enables or disables degree-of-interaction measurement.
    pub fn with_measure_degree(mut self, enabled: bool) -> Self {
        self.measure_degree = enabled;
        self
    }

    /// Sets the solver node limit.
    pub fn with_node_limit(mut self, limit: Option<u64>) -> Self {
        self.solver.node_limit = limit;
        self
    }
}

/// How the statements shared by a pair are turned into programs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SolveMode {
    /// One program per (pair, statement), primary then alternative.
    #[default]
    PerStatement,

    /// One program per pair covering all shared statements.
    Batched,
}

/// Thread count configuration for the pair search.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ThreadCount {
    /// Automatically determine based on available CPU cores.
    #[default]
    Auto,
    /// Use all available CPU cores.
    Unlimited,
    /// Use a specific number of threads.
    Specific(usize),
}

impl ThreadCount {
    /// Resolves the thread count for `work_items` independent pairs.
    pub fn resolve(&self, work_items: usize) -> usize {
        let cpus = std::thread::available_parallelism()
            .map(|p| p.get())
            .unwrap_or(1);
        match self {
            ThreadCount::Auto => cpus.min(work_items).max(1),
            ThreadCount::Unlimited => cpus,
            ThreadCount::Specific(n) => (*n).min(work_items).max(1),
        }
    }
}

impl fmt::Display for ThreadCount {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ThreadCount::Auto => write!(f, "Auto"),
            ThreadCount::Unlimited => write!(f, "Unlimited"),
            ThreadCount::Specific(n) => write!(f, "{}", n),
        }
    }
}

/// Solver backend settings.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "snake_case")]
pub struct SolverSettings {
    /// Maximum search nodes per solve (None = unlimited).
    #[serde(default = "default_node_limit")]
    pub node_limit: Option<u64>,

    /// Absolute tolerance for constraint satisfaction.
    #[serde(default = "default_tolerance")]
    pub tolerance: f64,
}

fn default_node_limit() -> Option<u64> {
    Some(2_000_000)
}

fn default_tolerance() -> f64 {
    1e-7
}

impl Default for SolverSettings {
    fn default() -> Self {
        Self {
            node_limit: default_node_limit(),
            tolerance: default_tolerance(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_toml_parsing() {
        let toml = r#"
            delta = 0.5
            measure_degree = true
            solver_retries = 2
            thread_count = "unlimited"

            [solver]
            tolerance = 1e-6
        "#;

        let config = InteractionConfig::from_toml_str(toml).unwrap();
        assert_eq!(config.delta, 0.5);
        assert!(config.measure_degree);
        assert_eq!(config.solver_retries, 2);
        assert_eq!(config.thread_count, ThreadCount::Unlimited);
        assert_eq!(config.solver.tolerance, 1e-6);
        assert_eq!(config.solver.node_limit, Some(2_000_000));
        assert_eq!(config.solve_mode, SolveMode::PerStatement);
    }

    #[test]
    fn test_yaml_parsing() {
        let yaml = r#"
            delta: 0.2
            solve_mode: batched
            thread_count: unlimited
            solver:
              node_limit: 1000
        "#;

        let config = InteractionConfig::from_yaml_str(yaml).unwrap();
        assert_eq!(config.delta, 0.2);
        assert_eq!(config.solve_mode, SolveMode::Batched);
        assert_eq!(config.thread_count, ThreadCount::Unlimited);
        assert_eq!(config.solver.node_limit, Some(1000));
    }

    #[test]
    fn test_empty_toml_is_default() {
        let config = InteractionConfig::from_toml_str("").unwrap();
        assert_eq!(config, InteractionConfig::default());
    }

    #[test]
    fn test_rejects_negative_delta() {
        let result = InteractionConfig::from_toml_str("delta = -0.1");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_rejects_zero_threads() {
        let result = InteractionConfig::from_toml_str("thread_count = { specific = 0 }");
        assert!(matches!(result, Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = InteractionConfig::load("/nonexistent/interaction.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_builder() {
        let config = InteractionConfig::new()
            .with_delta(0.3)
            .with_thread_count(ThreadCount::Specific(2))
            .with_solve_mode(SolveMode::Batched)
            .with_measure_degree(true)
            .with_node_limit(None);

        assert_eq!(config.delta, 0.3);
        assert_eq!(config.thread_count, ThreadCount::Specific(2));
        assert_eq!(config.solve_mode, SolveMode::Batched);
        assert!(config.measure_degree);
        assert_eq!(config.solver.node_limit, None);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_thread_count_resolve_specific() {
        assert_eq!(ThreadCount::Specific(4).resolve(10), 4);
        assert_eq!(ThreadCount::Specific(10).resolve(4), 4);
        assert_eq!(ThreadCount::Specific(4).resolve(0), 1);
    }

    #[test]
    fn test_thread_count_display() {
        assert_eq!(format!("{}", ThreadCount::Auto), "Auto");
        assert_eq!(format!("{}", ThreadCount::Unlimited), "Unlimited");
        assert_eq!(format!("{}", ThreadCount::Specific(4)), "4");
    }
}
