use std::sync::LazyLock;

use regex::Regex;

use super::units::canonical_unit;
use super::value::{parse_value, NUMBER, UNIT_TOKEN};
use super::{confidence, is_excluded_name, title_case, ExtractionStrategy};
use crate::models::{ParameterCandidate, SourceMethod, FALLBACK_CATEGORY, UNKNOWN};
use crate::pipeline::parameters::units::display_unit;

/// "term: number unit" with a separator, unit optional.
static SEPARATED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<name>[A-Za-z][A-Za-z ]{{1,40}}?)[ \t]*[:=\-][ \t]*(?P<value>{NUMBER})[ \t]*(?P<unit>[A-Za-z/%]+)?"
    ))
    .expect("invalid fallback regex")
});

/// "term number unit" with whitespace only, unit required.
static SPACED: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<name>[A-Za-z][A-Za-z ]{{1,40}}?)[ \t]+(?P<value>{NUMBER})[ \t]*(?P<unit>{UNIT_TOKEN})"
    ))
    .expect("invalid fallback regex")
});

static RELAXED_KEYWORDS: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:level|total|ratio|serum|plasma|count|index|rate|test|hdl|ldl|wbc|rbc|hb|cholesterol|glucose|sugar|protein|blood|cells?|acid|vitamin|iron|urea|lipid|enzyme|hormone)\b",
    )
    .expect("invalid keyword regex")
});

/// Last resort when every other strategy found nothing. Status is left unknown.
pub struct NumericFallback;

impl ExtractionStrategy for NumericFallback {
    fn method(&self) -> SourceMethod {
        SourceMethod::NumericFallback
    }

    fn extract(&self, lines: &[&str]) -> Vec<ParameterCandidate> {
        let mut candidates = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            for regex in [&*SEPARATED, &*SPACED] {
                for caps in regex.captures_iter(line) {
                    let name = caps["name"].trim();
                    let unit = caps.name("unit").map(|m| m.as_str());
                    let gate = RELAXED_KEYWORDS.is_match(name)
                        || unit.is_some_and(|u| canonical_unit(u).is_some());
                    if !gate || name.len() < 2 || is_excluded_name(name) {
                        continue;
                    }
                    let Some(value) = parse_value(&caps["value"]) else {
                        continue;
                    };
                    candidates.push(ParameterCandidate {
                        name: title_case(name),
                        value,
                        unit: unit.map(display_unit).unwrap_or_else(|| UNKNOWN.to_string()),
                        raw_range: None,
                        confidence: confidence::FALLBACK,
                        source_method: SourceMethod::NumericFallback,
                        vocabulary_range: None,
                        category: FALLBACK_CATEGORY.to_string(),
                        line: index,
                    });
                }
            }
        }
        candidates
    }
}
