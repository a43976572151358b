use std::sync::LazyLock;

use regex::Regex;

use super::value::{compact_range, parse_value, FLAG, NUMBER, RANGE, UNIT_TOKEN};
use super::{confidence, has_medical_keyword, heuristic_candidate, is_excluded_name, ExtractionStrategy};
use crate::models::{ParameterCandidate, SourceMethod};

static LOOSE_READING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?P<name>[A-Za-z][A-Za-z0-9 ,()'/+\-]*?)(?:\s*[:=]\s*|\s+-\s+|\s+)(?P<value>{NUMBER}){FLAG}(?:\s*(?P<unit>{UNIT_TOKEN}))?"
    ))
    .expect("invalid loose reading regex")
});

static RANGE_ANYWHERE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"\(?(?P<range>{RANGE})\)?")).expect("invalid range regex")
});

/// Filler words that prose puts between a name and its value.
const TRAILING_FILLER: &[&str] = &[
    "at", "is", "are", "was", "were", "of", "level", "levels", "value", "result", "reading", "measured", "found",
];

/// Drop filler words from the end of a captured name ("sugar was" → "sugar").
fn trim_filler(name: &str) -> &str {
    let mut name = name.trim();
    while let Some((head, last)) = name.rsplit_once(char::is_whitespace) {
        if !TRAILING_FILLER.contains(&last.to_lowercase().as_str()) {
            break;
        }
        name = head.trim_end();
    }
    name
}

static HAS_DIGIT: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"\d").expect("invalid digit regex"));

/// Lines mentioning a medical keyword next to a number.
pub struct MedicalContext;

impl ExtractionStrategy for MedicalContext {
    fn method(&self) -> SourceMethod {
        SourceMethod::Context
    }

    fn extract(&self, lines: &[&str]) -> Vec<ParameterCandidate> {
        let mut candidates = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            if !HAS_DIGIT.is_match(line) || !has_medical_keyword(line) {
                continue;
            }

            let reading = LOOSE_READING.captures_iter(line).find_map(|caps| {
                let name = trim_filler(caps["name"].trim().trim_end_matches([',', '-', '(']));
                if !has_medical_keyword(name) || is_excluded_name(name) {
                    return None;
                }
                let value = parse_value(&caps["value"])?;
                let whole = caps.get(0)?;
                let range = RANGE_ANYWHERE
                    .captures(&line[whole.end()..])
                    .map(|c| compact_range(&c["range"]));
                Some((name.to_string(), value, caps.name("unit").map(|m| m.as_str().to_string()), range))
            });

            if let Some((name, value, unit, range)) = reading {
                candidates.push(heuristic_candidate(
                    &name,
                    value,
                    unit.as_deref(),
                    range,
                    index,
                    confidence::CONTEXT,
                    SourceMethod::Context,
                ));
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_keyword_lines() {
        let found = MedicalContext.extract(&["Fasting blood sugar was 112 mg/dl (70-100) today"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 112.0);
        assert_eq!(found[0].source_method, SourceMethod::Context);
        assert_eq!(found[0].raw_range.as_deref(), Some("70-100"));
        assert!((found[0].confidence - confidence::CONTEXT).abs() < 1e-9);
    }

    #[test]
    fn filler_words_are_not_part_of_the_name() {
        assert_eq!(trim_filler("Serum transferrin was"), "Serum transferrin");
        assert_eq!(trim_filler("Uric acid level is"), "Uric acid");
        assert_eq!(trim_filler("Level"), "Level");

        let found = MedicalContext.extract(&["Serum transferrin was 250 mg/dL"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].name, "Serum Transferrin");
        assert_eq!(found[0].unit, "mg/dL");

        let found = MedicalContext.extract(&["Fasting blood sugar was 112 mg/dl"]);
        assert_eq!(found[0].name, "Glucose");
        assert!(!found[0].name.ends_with("Was"));
    }

    #[test]
    fn abnormal_flag_is_not_a_unit() {
        let found = MedicalContext.extract(&["Blood urea 60 H mg/dL"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 60.0);
        assert_eq!(found[0].unit, "mg/dL");
    }

    #[test]
    fn ignores_lines_without_keyword_or_number() {
        assert!(MedicalContext
            .extract(&["Blood sample collected", "Invoice 42 paid"])
            .is_empty());
    }
}
