use super::value::read_value;
use super::vocabulary::find_in_line;
use super::{confidence, vocabulary_candidate, ExtractionStrategy};
use crate::models::{ParameterCandidate, SourceMethod};

/// Word-boundary, case-insensitive vocabulary match.
pub struct ExactMatch;

impl ExtractionStrategy for ExactMatch {
    fn method(&self) -> SourceMethod {
        SourceMethod::Exact
    }

    fn extract(&self, lines: &[&str]) -> Vec<ParameterCandidate> {
        let mut candidates = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            for hit in find_in_line(line) {
                if let Some(reading) = read_value(line, hit.start, hit.end, hit.def) {
                    let score = confidence::EXACT * reading.shape.weight();
                    candidates.push(vocabulary_candidate(
                        hit.def,
                        reading,
                        index,
                        score,
                        SourceMethod::Exact,
                    ));
                }
            }
        }
        candidates
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reads_every_matching_line() {
        let lines = [
            "LIPID PROFILE",
            "Total Cholesterol  195  mg/dL  <200",
            "HDL Cholesterol  52  mg/dL  >40",
            "Glucose: 130 mg/dL",
        ];
        let found = ExactMatch.extract(&lines);
        let names: Vec<_> = found.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["Total Cholesterol", "HDL Cholesterol", "Glucose"]);
        assert!(found.iter().all(|c| c.source_method == SourceMethod::Exact));
        assert_eq!(found[0].line, 1);
        assert_eq!(found[2].vocabulary_range.as_deref(), Some("70-100"));
        assert!((found[0].confidence - confidence::EXACT).abs() < 1e-9);
    }

    #[test]
    fn headers_without_values_yield_nothing() {
        assert!(ExactMatch.extract(&["Glucose Tolerance", "Hemoglobin"]).is_empty());
    }
}
