//! Error types for the grader

use thiserror::Error;

/// Error raised when a scenario file cannot be turned into rules
#[derive(Debug, Error)]
#[error("Scenario '{path}' is invalid: {reason}")]
pub struct ScenarioError {
    pub path: String,
    pub reason: String,
}

/// Error raised when a level has no rule set loaded
#[derive(Debug, Error)]
#[error("No rule set loaded for level {level}. Loaded levels: {}", loaded_levels.iter().map(|l| l.to_string()).collect::<Vec<_>>().join(", "))]
pub struct LevelNotLoadedError {
    pub level: u32,
    pub loaded_levels: Vec<u32>,
}

/// General grader error type
#[derive(Debug, Error)]
pub enum GraderError {
    #[error(transparent)]
    Scenario(#[from] ScenarioError),

    #[error(transparent)]
    LevelNotLoaded(#[from] LevelNotLoadedError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),

    #[error("{0}")]
    Other(String),
}

pub type Result<T> = std::result::Result<T, GraderError>;
