//! Reference-range parsing and Normal/High/Low classification.
//!
//! Range text comes straight from report lines or the vocabulary, so parsing
//! is lenient about spacing, thousands separators and trailing units, and any
//! failure degrades to `Unknown` instead of an error.

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{ParameterStatus, Severity};

static LEADING_NUMBER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*=?\s*(\d+(?:\.\d+)?|\.\d+)").expect("invalid leading number regex")
});

/// Parsed reference range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ReferenceRange {
    /// `<max`: values at or above `max` are high.
    Below(f64),
    /// `>min`: values at or below `min` are low.
    Above(f64),
    /// `min-max`, inclusive on both ends.
    Between(f64, f64),
}

impl ReferenceRange {
    pub fn classify(&self, value: f64) -> ParameterStatus {
        match *self {
            Self::Below(max) if value >= max => ParameterStatus::High,
            Self::Above(min) if value <= min => ParameterStatus::Low,
            Self::Between(min, _) if value < min => ParameterStatus::Low,
            Self::Between(_, max) if value > max => ParameterStatus::High,
            _ => ParameterStatus::Normal,
        }
    }
}

/// Parse free-text range. Returns `None` for anything not in one of the three shapes.
pub fn parse_range(text: &str) -> Option<ReferenceRange> {
    let cleaned = text
        .replace(',', "")
        .trim()
        .trim_start_matches('(')
        .trim_end_matches(')')
        .trim()
        .to_string();

    if let Some(rest) = cleaned
        .strip_prefix('<')
        .or_else(|| cleaned.strip_prefix('≤'))
    {
        return leading_number(rest).map(ReferenceRange::Below);
    }
    if let Some(rest) = cleaned
        .strip_prefix('>')
        .or_else(|| cleaned.strip_prefix('≥'))
    {
        return leading_number(rest).map(ReferenceRange::Above);
    }

    let (low, high) = cleaned
        .split_once('-')
        .or_else(|| cleaned.split_once('–'))?;
    let min = leading_number(low)?;
    let max = leading_number(high)?;
    if low.trim().is_empty() || min > max {
        return None;
    }
    Some(ReferenceRange::Between(min, max))
}

/// Classify `value` against `range`. Never fails: unparseable input is `Unknown`.
pub fn classify(value: f64, range: Option<&str>) -> ParameterStatus {
    if !value.is_finite() {
        return ParameterStatus::Unknown;
    }
    match range.and_then(parse_range) {
        Some(parsed) => parsed.classify(value),
        None => ParameterStatus::Unknown,
    }
}

/// How far outside the range a value sits, relative to the range's own scale.
///
/// Returns `None` when the value is in range or the range does not parse.
pub fn severity(value: f64, range: Option<&str>) -> Option<Severity> {
    let parsed = range.and_then(parse_range)?;
    let (deviation, scale) = match parsed {
        ReferenceRange::Below(max) if value >= max => (value - max, max),
        ReferenceRange::Above(min) if value <= min => (min - value, min),
        ReferenceRange::Between(min, max) if value < min => (min - value, max - min),
        ReferenceRange::Between(min, max) if value > max => (value - max, max - min),
        _ => return None,
    };

    let relative = if scale > 0.0 { deviation / scale } else { 1.0 };
    Some(if relative < 0.25 {
        Severity::Mild
    } else if relative < 0.5 {
        Severity::Moderate
    } else {
        Severity::Significant
    })
}

fn leading_number(text: &str) -> Option<f64> {
    let captures = LEADING_NUMBER.captures(text)?;
    captures[1].parse::<f64>().ok().filter(|v| v.is_finite())
}
