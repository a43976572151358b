use std::sync::LazyLock;

use regex::Regex;

use super::units::{canonical_unit, is_unit_like};
use super::value::{compact_range, parse_value, FLAG, NUMBER, RANGE, UNIT_TOKEN};
use super::{confidence, has_medical_keyword, heuristic_candidate, is_excluded_name, ExtractionStrategy};
use crate::models::{ParameterCandidate, SourceMethod};
use crate::pipeline::parameters::vocabulary::lookup_exact;

/// Name-like text: starts with a letter, no double spaces inside.
const NAME: &str = r"[A-Za-z][A-Za-z0-9 ,()'/+\-.]*?[A-Za-z0-9)+]";

fn row(separator: &str) -> Regex {
    Regex::new(&format!(
        r"^(?P<name>{NAME}){separator}(?P<value>{NUMBER}){FLAG}(?:[\s|]*(?P<unit>{UNIT_TOKEN}))?(?:[\s|]+\(?(?P<range>{RANGE})\)?)?"
    ))
    .expect("invalid table row regex")
}

/// Column gap: two or more spaces, tabs, or a pipe.
static TABLE_ROW: LazyLock<Regex> = LazyLock::new(|| row(r"(?:\s*\|\s*|\s{2,})"));

/// Inline separator: colon, equals, or a spaced dash.
static LAYOUT_ROW: LazyLock<Regex> = LazyLock::new(|| row(r"(?:\s*[:=]\s*|\s+-\s+)"));

/// Generic row heuristic, no vocabulary required.
pub struct TableLayout;

impl TableLayout {
    fn read_row(&self, regex: &Regex, line: &str) -> Option<RowReading> {
        let caps = regex.captures(line)?;
        let name = caps["name"].trim().trim_end_matches([',', '.', '-']).trim();
        let value = parse_value(&caps["value"])?;
        let unit = caps.name("unit").map(|m| m.as_str());
        let range = caps.name("range").map(|m| compact_range(m.as_str()));

        if !looks_like_health_parameter(name, unit, range.is_some()) {
            return None;
        }
        Some(RowReading {
            name: name.to_string(),
            value,
            unit: unit.map(str::to_string),
            range,
        })
    }
}

struct RowReading {
    name: String,
    value: f64,
    unit: Option<String>,
    range: Option<String>,
}

/// Secondary classifier for generic rows.
pub fn looks_like_health_parameter(name: &str, unit: Option<&str>, has_range: bool) -> bool {
    let words = name.split_whitespace().count();
    if name.len() < 2 || name.len() > 40 || words > 5 || is_excluded_name(name) {
        return false;
    }
    if lookup_exact(name).is_some() || has_medical_keyword(name) {
        return true;
    }
    match unit {
        Some(u) if canonical_unit(u).is_some() => true,
        Some(u) => is_unit_like(u) && has_range,
        None => false,
    }
}

impl ExtractionStrategy for TableLayout {
    fn method(&self) -> SourceMethod {
        SourceMethod::Table
    }

    fn extract(&self, lines: &[&str]) -> Vec<ParameterCandidate> {
        let mut candidates = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            let (reading, method, score) = match self.read_row(&TABLE_ROW, line) {
                Some(r) => (r, SourceMethod::Table, confidence::TABLE),
                None => match self.read_row(&LAYOUT_ROW, line) {
                    Some(r) => (r, SourceMethod::Layout, confidence::LAYOUT),
                    None => continue,
                },
            };
            candidates.push(heuristic_candidate(
                &reading.name,
                reading.value,
                reading.unit.as_deref(),
                reading.range,
                index,
                score,
                method,
            ));
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn spaced_columns_become_table_candidates() {
        let found = TableLayout.extract(&["Serum Iron  85  ug/dL  60-170"]);
        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.name, "Serum Iron");
        assert_eq!(c.value, 85.0);
        assert_eq!(c.unit, "ug/dL");
        assert_eq!(c.raw_range.as_deref(), Some("60-170"));
        assert_eq!(c.source_method, SourceMethod::Table);
        assert_eq!(c.category, "Lab Result");
    }

    #[test]
    fn colon_rows_are_layout_candidates() {
        let found = TableLayout.extract(&["Magnesium: 2.1 mg/dL"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].source_method, SourceMethod::Layout);
        assert_eq!(found[0].unit, "mg/dL");
    }

    #[test]
    fn vocabulary_names_are_canonicalized() {
        let found = TableLayout.extract(&["WBC | 7.2 | K/uL"]);
        assert_eq!(found[0].name, "White Blood Cells");
        assert_eq!(found[0].unit, "10^3/uL");
        assert_eq!(found[0].vocabulary_range.as_deref(), Some("4.5-11.0"));
    }

    #[test]
    fn abnormal_flag_is_skipped() {
        let found = TableLayout.extract(&["Glucose, Fasting  130 H mg/dL  70-100"]);
        assert_eq!(found.len(), 1);
        let c = &found[0];
        assert_eq!(c.name, "Glucose");
        assert_eq!(c.unit, "mg/dL");
        assert_eq!(c.raw_range.as_deref(), Some("70-100"));
        assert_eq!(c.vocabulary_range.as_deref(), Some("70-100"));
        assert_eq!(c.category, "Diabetes");
    }

    #[test]
    fn thousands_separator_is_part_of_the_value() {
        let found = TableLayout.extract(&["Platelets  250,000  /uL  150,000-450,000"]);
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].value, 250_000.0);
        assert_eq!(found[0].unit, "/uL");
        assert_eq!(found[0].raw_range.as_deref(), Some("150000-450000"));
    }

    #[test]
    fn chrome_lines_are_rejected() {
        let lines = [
            "Patient ID:  12345",
            "Age: 45 Years",
            "Page  1  of 2",
            "Date: 2024-01-15",
            "Collected  08  AM",
        ];
        assert!(TableLayout.extract(&lines).is_empty());
    }

    #[test]
    fn unknown_words_without_evidence_are_rejected() {
        assert!(TableLayout.extract(&["Room  12  B"]).is_empty());
    }
}
