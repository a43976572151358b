//! Health parameter extraction from normalized report text.
//!
//! Strategies form a ranked list of pure functions over the same lines. The
//! first four always run; the numeric fallback only runs when they found
//! nothing. Candidates are then merged and classified.

pub mod context;
pub mod exact;
pub mod fallback;
pub mod fuzzy;
pub mod merge;
pub mod table;
pub mod units;
pub mod value;
pub mod vocabulary;

use std::sync::LazyLock;

use regex::Regex;

use crate::models::{HealthParameter, ParameterCandidate, SourceMethod, DEFAULT_CATEGORY, UNKNOWN};
use crate::pipeline::status::classify;
use crate::pipeline_config::PipelineConfig;

use self::units::{canonical_unit, display_unit};
use self::value::ValueReading;
use self::vocabulary::{find_in_line, lookup_exact, ParameterDef};

/// Base confidence per strategy.
pub mod confidence {
    pub const EXACT: f64 = 0.95;
    pub const FUZZY_MULTIPLIER: f64 = 0.8;
    pub const TABLE: f64 = 0.7;
    pub const LAYOUT: f64 = 0.65;
    pub const CONTEXT: f64 = 0.5;
    pub const FALLBACK: f64 = 0.4;
}

/// One extraction strategy over the lines of a document.
pub trait ExtractionStrategy: Send + Sync {
    fn method(&self) -> SourceMethod;
    fn extract(&self, lines: &[&str]) -> Vec<ParameterCandidate>;
}

static MEDICAL_KEYWORD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?i)\b(?:cholesterol|glucose|hemoglobin|haemoglobin|blood|count|triglycerides?|creatinine|bilirubin|protein|albumin|globulin|urea|sodium|potassium|chloride|calcium|magnesium|phosphorus|iron|ferritin|vitamin|thyroid|hormone|enzyme|lipid|sugar|acid|cells?|platelets?|serum|plasma|insulin|uric|lipase|amylase|transferrin)\b",
    )
    .expect("invalid medical keyword regex")
});

/// Words that mark header, footer or table chrome rather than a measurement.
const EXCLUDED_WORDS: &[&str] = &[
    "account", "accession", "address", "age", "amount", "barcode", "bed", "birth", "collected",
    "date", "dob", "doctor", "dr", "fax", "gender", "id", "invoice", "lab", "laboratory", "method",
    "mrn", "name", "no", "number", "page", "patient", "phone", "physician", "printed", "received",
    "ref", "referred", "registered", "report", "reported", "sample", "sex", "specimen", "tel",
    "time", "units", "visit", "ward", "year", "years",
];

pub(crate) fn has_medical_keyword(text: &str) -> bool {
    MEDICAL_KEYWORD.is_match(text)
}

pub(crate) fn is_excluded_name(name: &str) -> bool {
    name.split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .any(|w| EXCLUDED_WORDS.contains(&w.to_lowercase().as_str()))
}

/// Abbreviations printed in capitals on reports.
const ACRONYMS: &[&str] = &[
    "ALP", "ALT", "AST", "BUN", "CBC", "CK", "CRP", "ESR", "FBS", "GGT", "HB", "HCT", "HDL", "HGB",
    "INR", "LDH", "LDL", "MCH", "MCHC", "MCV", "MPV", "PCV", "PLT", "PSA", "PT", "PTT", "RBC",
    "RDW", "SGOT", "SGPT", "TIBC", "TSH", "VLDL", "WBC",
];

fn is_acronym(word: &str) -> bool {
    let core: String = word
        .chars()
        .filter(|c| c.is_alphanumeric())
        .collect::<String>()
        .to_uppercase();
    ACRONYMS.contains(&core.as_str())
}

/// Title-case a free-text name. Known acronyms are capitalized and words with
/// digits are left alone, so OCR casing does not split one analyte in two.
pub fn title_case(name: &str) -> String {
    name.split_whitespace()
        .map(|word| {
            if word.chars().any(|c| c.is_ascii_digit()) {
                return word.to_string();
            }
            if is_acronym(word) {
                return word.to_uppercase();
            }
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn vocabulary_candidate(
    def: &'static ParameterDef,
    reading: ValueReading,
    line: usize,
    confidence: f64,
    method: SourceMethod,
) -> ParameterCandidate {
    ParameterCandidate {
        name: def.name.to_string(),
        value: reading.value,
        unit: reading.unit.to_string(),
        raw_range: reading.raw_range,
        confidence,
        source_method: method,
        vocabulary_range: def.range_for(reading.unit).map(str::to_string),
        category: def.category.to_string(),
        line,
    }
}

/// Vocabulary entry for a heuristic name: the whole name when it is a known
/// pattern, otherwise the only known pattern inside it ("Glucose, Fasting").
fn resolve_def(name: &str) -> Option<&'static ParameterDef> {
    lookup_exact(name).or_else(|| match find_in_line(name).as_slice() {
        [hit] => Some(hit.def),
        _ => None,
    })
}

/// Candidate from a heuristic strategy, canonicalized against the vocabulary when
/// the name resolves to a single entry.
fn heuristic_candidate(
    name: &str,
    value: f64,
    unit: Option<&str>,
    raw_range: Option<String>,
    line: usize,
    confidence: f64,
    method: SourceMethod,
) -> ParameterCandidate {
    let def = resolve_def(name);
    let unit_text = unit.map(display_unit).unwrap_or_else(|| UNKNOWN.to_string());
    let vocabulary_range = def
        .zip(unit.and_then(canonical_unit))
        .and_then(|(def, unit)| def.range_for(unit))
        .map(str::to_string);

    ParameterCandidate {
        name: def.map_or_else(|| title_case(name), |d| d.name.to_string()),
        value,
        unit: unit_text,
        raw_range,
        confidence,
        source_method: method,
        vocabulary_range,
        category: def.map_or(DEFAULT_CATEGORY, |d| d.category).to_string(),
        line,
    }
}

/// Ranked strategy pipeline plus merge and classification.
pub struct ParameterExtractor {
    strategies: Vec<Box<dyn ExtractionStrategy>>,
    fallback: Box<dyn ExtractionStrategy>,
}

impl Default for ParameterExtractor {
    fn default() -> Self {
        Self::with_fuzzy(fuzzy::FuzzyMatch::default())
    }
}

impl ParameterExtractor {
    pub fn new(config: &PipelineConfig) -> Self {
        Self::with_fuzzy(fuzzy::FuzzyMatch {
            similarity: config.fuzzy_similarity,
            word_ratio: config.fuzzy_word_ratio,
        })
    }

    fn with_fuzzy(fuzzy: fuzzy::FuzzyMatch) -> Self {
        Self {
            strategies: vec![
                Box::new(exact::ExactMatch),
                Box::new(fuzzy),
                Box::new(table::TableLayout),
                Box::new(context::MedicalContext),
            ],
            fallback: Box::new(fallback::NumericFallback),
        }
    }

    /// All candidates, before merging.
    pub fn candidates(&self, text: &str) -> Vec<ParameterCandidate> {
        let lines: Vec<&str> = text.lines().collect();
        let mut found: Vec<ParameterCandidate> = Vec::new();

        for strategy in &self.strategies {
            let produced = strategy.extract(&lines);
            tracing::debug!(
                strategy = strategy.method().as_str(),
                candidates = produced.len(),
                "Extraction strategy finished"
            );
            found.extend(produced);
        }

        if found.is_empty() {
            found = self.fallback.extract(&lines);
            tracing::debug!(
                strategy = self.fallback.method().as_str(),
                candidates = found.len(),
                "Numeric fallback engaged"
            );
        }
        found
    }

    /// Extract, merge and classify. Never fails; no parameters is an empty list.
    pub fn extract(&self, text: &str) -> Vec<HealthParameter> {
        self.resolve(self.candidates(text))
    }

    /// Deduplicate candidates and classify the survivors.
    pub fn resolve(&self, candidates: Vec<ParameterCandidate>) -> Vec<HealthParameter> {
        merge::merge(candidates).into_iter().map(finalize).collect()
    }
}

fn finalize(candidate: ParameterCandidate) -> HealthParameter {
    let range = candidate.effective_range().map(str::to_string);
    let status = classify(candidate.value, range.as_deref());
    HealthParameter {
        name: candidate.name,
        value: candidate.value,
        unit: candidate.unit,
        normal_range: range.unwrap_or_else(|| UNKNOWN.to_string()),
        status,
        category: candidate.category,
    }
}

/// Extract with default thresholds.
pub fn extract(text: &str) -> Vec<HealthParameter> {
    ParameterExtractor::default().extract(text)
}
