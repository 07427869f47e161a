//! Use-case errors

use grader_domain::{LevelError, RepositoryError};
use thiserror::Error;

/// Why a classifier stage produced nothing.
///
/// Never leaves the classifier chain: every variant becomes an empty
/// match list plus a warning.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ClassifierError {
    #[error("classification service failed: {0}")]
    Service(String),

    #[error("classification service timed out after {0}s")]
    Timeout(u64),

    #[error("classification response is not JSON: {0}")]
    Parse(String),

    #[error("classification response does not match the schema: {0}")]
    Schema(String),
}

/// Errors that abort one engine operation (never the tick loop)
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum EngineError {
    #[error("store error: {0}")]
    Repository(RepositoryError),

    #[error("level error: {0}")]
    Level(LevelError),

    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    #[error("no rule set loaded for level {level} (loaded: {loaded:?})")]
    MissingRuleSet { level: u32, loaded: Vec<u32> },
}

impl From<RepositoryError> for EngineError {
    fn from(err: RepositoryError) -> Self {
        EngineError::Repository(err)
    }
}

impl From<LevelError> for EngineError {
    fn from(err: LevelError) -> Self {
        EngineError::Level(err)
    }
}

pub type Result<T> = std::result::Result<T, EngineError>;
