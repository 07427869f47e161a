//! Configuration types for the grader

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::GraderError;

/// Weights of the three sub-scores inside the composite health score
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct WeightsConfig {
    pub bystander: f64,
    pub victim_support: f64,
    pub bully: f64,
}

impl Default for WeightsConfig {
    fn default() -> Self {
        Self {
            bystander: 0.3,
            victim_support: 0.4,
            bully: 0.3,
        }
    }
}

/// One step of the level duration step function
///
/// Applies to `from_level` and every level above it, until a later step
/// takes over.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LevelDurationStep {
    pub from_level: u32,
    pub seconds: u64,
}

/// Settings for the external classification service
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ClassifierConfig {
    /// Chat model used for classification
    pub model: String,

    /// Base URL of an OpenAI-compatible API
    pub base_url: String,

    /// Upper bound for one classification call
    pub timeout_secs: u64,

    /// Completion token budget
    pub max_tokens: u32,

    /// Action text is truncated to this many characters in the request
    pub text_limit: usize,

    /// Category that only applies to 1:1 direct chats
    pub sensitive_category: String,

    /// Identity-disclosure pattern used by the heuristic fallback
    pub disclosure_pattern: String,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            timeout_secs: 20,
            max_tokens: 1000,
            text_limit: 500,
            sensitive_category: "InvestigateInformer".to_string(),
            disclosure_pattern: r"(?i)(who|identity|leak|told|shared|disclos)".to_string(),
        }
    }
}

/// Win/lose policy settings
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OutcomeConfig {
    /// Health score at which a level is won before the clock runs out
    pub win_threshold: Option<u32>,

    /// How many harmful actions are attached to a lose outcome
    pub feedback_limit: usize,
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct EngineConfig {
    /// Score broadcast period
    pub broadcast_period_ms: u64,

    /// Pending-action classification period
    pub classification_period_ms: u64,

    /// Seconds of elapsed level time per health point lost
    pub decay_rate_seconds: u64,

    pub weights: WeightsConfig,

    pub level_durations: Vec<LevelDurationStep>,

    pub classifier: ClassifierConfig,

    pub outcome: OutcomeConfig,

    /// Directory holding level_order.json and the per-level folders
    pub scenario_dir: PathBuf,

    pub start_level: u32,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            broadcast_period_ms: 1_000,
            classification_period_ms: 10_000,
            decay_rate_seconds: 10,
            weights: WeightsConfig::default(),
            level_durations: vec![
                LevelDurationStep {
                    from_level: 1,
                    seconds: 300,
                },
                LevelDurationStep {
                    from_level: 3,
                    seconds: 600,
                },
            ],
            classifier: ClassifierConfig::default(),
            outcome: OutcomeConfig {
                win_threshold: None,
                feedback_limit: 3,
            },
            scenario_dir: PathBuf::from("scenarios"),
            start_level: 1,
        }
    }
}

impl EngineConfig {
    /// Load configuration from a JSON or YAML file (picked by extension)
    pub fn from_file(path: &Path) -> crate::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Self = match path.extension().and_then(|e| e.to_str()) {
            Some("yaml") | Some("yml") => serde_yaml::from_str(&content)?,
            _ => serde_json::from_str(&content)?,
        };
        config.validate()?;
        Ok(config)
    }

    /// Reject values the engine cannot run with
    pub fn validate(&self) -> crate::Result<()> {
        if self.decay_rate_seconds == 0 {
            return Err(GraderError::Config(
                "decayRateSeconds must be greater than zero".to_string(),
            ));
        }
        if self.broadcast_period_ms == 0 || self.classification_period_ms == 0 {
            return Err(GraderError::Config(
                "tick periods must be greater than zero".to_string(),
            ));
        }
        if self.level_durations.is_empty() {
            return Err(GraderError::Config(
                "levelDurations needs at least one step".to_string(),
            ));
        }
        if self.start_level == 0 {
            return Err(GraderError::Config("startLevel starts at 1".to_string()));
        }
        Ok(())
    }
}
