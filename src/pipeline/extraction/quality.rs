//! Quality score used to rank recognition attempts.
//!
//! ```text
//! score = 0.1*chars + 0.3*confidence + 2*digits + 10*medicalTerms
//!       + 8*tablePatterns + 12*unitPatterns + 20*(words > 10) + 30*(chars > 100)
//! ```

use std::sync::LazyLock;

use regex::Regex;

static MEDICAL_TERM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)cholesterol|glucose|hemoglobin|blood|count|triglyceride|creatinine|bilirubin|protein|albumin|globulin|ratio|urea|sodium|potassium|chloride|test|result|value|reference|range|normal|high|low|mg|dl|mmol|gm",
    )
    .expect("invalid medical term regex")
});

static TABLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\w+\s*[:\-]\s*\d+").expect("invalid table pattern regex"));

static UNIT_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)\d+\.?\d*\s*(?:mg/dl|mmol/l|g/dl|%|\w+/\w+)").expect("invalid unit pattern regex")
});

/// Counts feeding the quality score.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct TextStats {
    pub chars: usize,
    pub words: usize,
    pub digits: usize,
    pub medical_terms: usize,
    pub table_patterns: usize,
    pub unit_patterns: usize,
}

impl TextStats {
    pub fn of(text: &str) -> Self {
        Self {
            chars: text.chars().count(),
            words: text.split_whitespace().count(),
            digits: text.chars().filter(char::is_ascii_digit).count(),
            medical_terms: MEDICAL_TERM.find_iter(text).count(),
            table_patterns: TABLE_PATTERN.find_iter(text).count(),
            unit_patterns: UNIT_PATTERN.find_iter(text).count(),
        }
    }

    pub fn score(&self, confidence: f32) -> f64 {
        let bonus = |cond: bool, points: f64| if cond { points } else { 0.0 };
        0.1 * self.chars as f64
            + 0.3 * f64::from(confidence)
            + 2.0 * self.digits as f64
            + 10.0 * self.medical_terms as f64
            + 8.0 * self.table_patterns as f64
            + 12.0 * self.unit_patterns as f64
            + bonus(self.words > 10, 20.0)
            + bonus(self.chars > 100, 30.0)
    }
}

/// Score of `text` recognized at `confidence` (0-100).
pub fn quality_score(text: &str, confidence: f32) -> f64 {
    TextStats::of(text).score(confidence)
}
