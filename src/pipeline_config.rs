//! Pipeline tunables.
//!
//! Defaults are compiled in; a JSON file and `LABSENSE_*` environment variables
//! may override them. Thresholds are heuristics, not invariants.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid config file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("Invalid value for {field}: {reason}")]
    InvalidValue { field: &'static str, reason: String },
}

// ═══════════════════════════════════════════════════════════
// Types
// ═══════════════════════════════════════════════════════════

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Concurrent preprocessing/recognition attempts. Each holds a full image buffer.
    pub worker_limit: usize,
    /// Timeout for a single recognition attempt.
    pub attempt_timeout_secs: u64,
    /// Hard wall-clock budget for one document.
    pub document_timeout_secs: u64,
    /// Recognition language.
    pub language: String,
    /// PDF text layers shorter than this are treated as scanned.
    pub direct_text_min_chars: usize,
    /// Adopted text shorter than this flags the document as likely scanned.
    pub scanned_text_threshold: usize,
    /// Best quality score below this triggers the desperation pass.
    pub desperation_score_floor: f64,
    /// Desperation output is adopted only at or above this length.
    pub desperation_min_chars: usize,
    /// Per-word similarity for fuzzy vocabulary matching.
    pub fuzzy_similarity: f64,
    /// Fraction of pattern words that must match for a fuzzy hit.
    pub fuzzy_word_ratio: f64,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            worker_limit: 2,
            attempt_timeout_secs: 120,
            document_timeout_secs: 600,
            language: "eng".into(),
            direct_text_min_chars: 10,
            scanned_text_threshold: 50,
            desperation_score_floor: 150.0,
            desperation_min_chars: 10,
            fuzzy_similarity: 0.8,
            fuzzy_word_ratio: 0.7,
        }
    }
}

// ═══════════════════════════════════════════════════════════
// Loading
// ═══════════════════════════════════════════════════════════

impl PipelineConfig {
    /// Load from a JSON file; missing fields keep their defaults.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = std::fs::read_to_string(path)?;
        let config: Self = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Defaults with environment overrides applied.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::default().with_env_overrides()
    }

    /// Apply `LABSENSE_*` overrides on top of `self`.
    pub fn with_env_overrides(mut self) -> Result<Self, ConfigError> {
        if let Some(v) = env_parse("LABSENSE_WORKER_LIMIT", "worker_limit")? {
            self.worker_limit = v;
        }
        if let Some(v) = env_parse("LABSENSE_ATTEMPT_TIMEOUT_SECS", "attempt_timeout_secs")? {
            self.attempt_timeout_secs = v;
        }
        if let Some(v) = env_parse("LABSENSE_DOCUMENT_TIMEOUT_SECS", "document_timeout_secs")? {
            self.document_timeout_secs = v;
        }
        if let Ok(lang) = std::env::var("LABSENSE_LANGUAGE") {
            if !lang.trim().is_empty() {
                self.language = lang.trim().to_string();
            }
        }
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.worker_limit == 0 {
            return Err(ConfigError::InvalidValue {
                field: "worker_limit",
                reason: "must be at least 1".into(),
            });
        }
        if self.attempt_timeout_secs == 0 || self.document_timeout_secs == 0 {
            return Err(ConfigError::InvalidValue {
                field: "timeouts",
                reason: "must be positive".into(),
            });
        }
        if !(0.0..=1.0).contains(&self.fuzzy_similarity)
            || !(0.0..=1.0).contains(&self.fuzzy_word_ratio)
        {
            return Err(ConfigError::InvalidValue {
                field: "fuzzy thresholds",
                reason: "must lie in [0, 1]".into(),
            });
        }
        Ok(())
    }

    pub fn attempt_timeout(&self) -> Duration {
        Duration::from_secs(self.attempt_timeout_secs)
    }

    pub fn document_timeout(&self) -> Duration {
        Duration::from_secs(self.document_timeout_secs)
    }
}

fn env_parse<T: std::str::FromStr>(
    key: &str,
    field: &'static str,
) -> Result<Option<T>, ConfigError>
where
    T::Err: std::fmt::Display,
{
    match std::env::var(key) {
        Ok(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                field,
                reason: e.to_string(),
            }),
        Err(_) => Ok(None),
    }
}
