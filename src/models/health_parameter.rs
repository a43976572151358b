use serde::{Deserialize, Serialize};

use super::enums::{ParameterStatus, SourceMethod};

/// Sentinel used for unit and range text when nothing was found.
pub const UNKNOWN: &str = "Unknown";

/// Category assigned to heuristic matches outside the vocabulary.
pub const DEFAULT_CATEGORY: &str = "Lab Result";

/// Category assigned to numeric-fallback matches.
pub const FALLBACK_CATEGORY: &str = "General";

/// A final, classified measurement ready for persistence.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthParameter {
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub normal_range: String,
    pub status: ParameterStatus,
    pub category: String,
}

/// Provisional extraction result awaiting merge.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ParameterCandidate {
    /// Canonical (title-cased or vocabulary) name.
    pub name: String,
    pub value: f64,
    pub unit: String,
    pub raw_range: Option<String>,
    pub confidence: f64,
    pub source_method: SourceMethod,
    /// Range to fall back on when the line carries none.
    pub vocabulary_range: Option<String>,
    pub category: String,
    /// Zero-based line index the candidate was read from.
    pub line: usize,
}

impl ParameterCandidate {
    /// Range text used for classification: explicit text first, then vocabulary.
    pub fn effective_range(&self) -> Option<&str> {
        self.raw_range
            .as_deref()
            .or(self.vocabulary_range.as_deref())
    }
}
