//! Controlled vocabulary of known health parameters.
//!
//! A static arena of [`ParameterDef`] rows. Extending coverage means adding a
//! row here; the strategies never name a parameter directly.

use std::sync::LazyLock;

use regex::Regex;

/// Normal range for one accepted unit.
#[derive(Debug)]
pub struct UnitRange {
    pub unit: &'static str,
    pub range: &'static str,
}

#[derive(Debug)]
pub struct ParameterDef {
    /// Canonical display name.
    pub name: &'static str,
    pub category: &'static str,
    /// Lowercase textual patterns, matched on word boundaries.
    pub patterns: &'static [&'static str],
    /// Accepted canonical units, each with its reference range.
    pub units: &'static [UnitRange],
}

impl ParameterDef {
    pub fn accepts_unit(&self, canonical: &str) -> bool {
        self.units.iter().any(|u| u.unit == canonical)
    }

    pub fn range_for(&self, canonical: &str) -> Option<&'static str> {
        self.units
            .iter()
            .find(|u| u.unit == canonical)
            .map(|u| u.range)
    }
}

macro_rules! units {
    ($($unit:literal => $range:literal),+ $(,)?) => {
        &[$(UnitRange { unit: $unit, range: $range }),+]
    };
}

const LIPID: &str = "Lipid Panel";
const GLUCOSE: &str = "Diabetes";
const CBC: &str = "Complete Blood Count";
const CMP: &str = "Metabolic Panel";
const THYROID: &str = "Thyroid";
const VITAMINS: &str = "Vitamins & Minerals";

pub static VOCABULARY: &[ParameterDef] = &[
    // Lipid panel
    ParameterDef {
        name: "Total Cholesterol",
        category: LIPID,
        patterns: &["total cholesterol", "cholesterol, total", "cholesterol total", "serum cholesterol", "cholesterol"],
        units: units!["mg/dL" => "<200", "mmol/L" => "<5.2"],
    },
    ParameterDef {
        name: "HDL Cholesterol",
        category: LIPID,
        patterns: &["hdl cholesterol", "hdl-c", "hdl", "high density lipoprotein"],
        units: units!["mg/dL" => ">40", "mmol/L" => ">1.0"],
    },
    ParameterDef {
        name: "LDL Cholesterol",
        category: LIPID,
        patterns: &["ldl cholesterol", "ldl-c", "ldl", "low density lipoprotein"],
        units: units!["mg/dL" => "<100", "mmol/L" => "<2.6"],
    },
    ParameterDef {
        name: "VLDL Cholesterol",
        category: LIPID,
        patterns: &["vldl cholesterol", "vldl"],
        units: units!["mg/dL" => "5-40"],
    },
    ParameterDef {
        name: "Non-HDL Cholesterol",
        category: LIPID,
        patterns: &["non-hdl cholesterol", "non hdl cholesterol", "non-hdl"],
        units: units!["mg/dL" => "<130"],
    },
    ParameterDef {
        name: "Triglycerides",
        category: LIPID,
        patterns: &["triglycerides", "triglyceride", "trig"],
        units: units!["mg/dL" => "<150", "mmol/L" => "<1.7"],
    },
    // Glucose
    ParameterDef {
        name: "Glucose",
        category: GLUCOSE,
        patterns: &["glucose", "fasting glucose", "blood sugar", "fasting blood sugar", "fbs"],
        units: units!["mg/dL" => "70-100", "mmol/L" => "3.9-5.6"],
    },
    ParameterDef {
        name: "HbA1c",
        category: GLUCOSE,
        patterns: &["hba1c", "hemoglobin a1c", "glycated hemoglobin", "glycosylated hemoglobin", "a1c"],
        units: units!["%" => "4.0-5.6"],
    },
    // Complete blood count
    ParameterDef {
        name: "White Blood Cells",
        category: CBC,
        patterns: &["white blood cells", "white blood cell count", "wbc", "leukocytes", "leukocyte count", "total leukocyte count"],
        units: units!["10^3/uL" => "4.5-11.0", "/uL" => "4500-11000"],
    },
    ParameterDef {
        name: "Red Blood Cells",
        category: CBC,
        patterns: &["red blood cells", "red blood cell count", "rbc", "erythrocytes"],
        units: units!["10^6/uL" => "4.2-5.9"],
    },
    ParameterDef {
        name: "Hemoglobin",
        category: CBC,
        patterns: &["hemoglobin", "haemoglobin", "hgb", "hb"],
        units: units!["g/dL" => "12.0-17.5", "g/L" => "120-175"],
    },
    ParameterDef {
        name: "Hematocrit",
        category: CBC,
        patterns: &["hematocrit", "haematocrit", "hct", "packed cell volume", "pcv"],
        units: units!["%" => "36-50"],
    },
    ParameterDef {
        name: "Platelets",
        category: CBC,
        patterns: &["platelets", "platelet count", "plt", "thrombocytes"],
        units: units!["10^3/uL" => "150-450", "/uL" => "150000-450000"],
    },
    ParameterDef {
        name: "MCV",
        category: CBC,
        patterns: &["mcv", "mean corpuscular volume", "mean cell volume"],
        units: units!["fL" => "80-100"],
    },
    ParameterDef {
        name: "MCH",
        category: CBC,
        patterns: &["mch", "mean corpuscular hemoglobin", "mean cell hemoglobin"],
        units: units!["pg" => "27-33"],
    },
    ParameterDef {
        name: "MCHC",
        category: CBC,
        patterns: &["mchc", "mean corpuscular hemoglobin concentration"],
        units: units!["g/dL" => "32-36"],
    },
    ParameterDef {
        name: "RDW",
        category: CBC,
        patterns: &["rdw", "rdw-cv", "red cell distribution width"],
        units: units!["%" => "11.5-14.5"],
    },
    ParameterDef {
        name: "Neutrophils",
        category: CBC,
        patterns: &["neutrophils", "neutrophil", "neut", "polymorphs"],
        units: units!["%" => "40-70"],
    },
    ParameterDef {
        name: "Lymphocytes",
        category: CBC,
        patterns: &["lymphocytes", "lymphocyte", "lymph"],
        units: units!["%" => "20-40"],
    },
    ParameterDef {
        name: "Monocytes",
        category: CBC,
        patterns: &["monocytes", "monocyte", "mono"],
        units: units!["%" => "2-8"],
    },
    ParameterDef {
        name: "Eosinophils",
        category: CBC,
        patterns: &["eosinophils", "eosinophil", "eos"],
        units: units!["%" => "1-4"],
    },
    ParameterDef {
        name: "Basophils",
        category: CBC,
        patterns: &["basophils", "basophil", "baso"],
        units: units!["%" => "0-1"],
    },
    ParameterDef {
        name: "Absolute Neutrophils",
        category: CBC,
        patterns: &["absolute neutrophils", "absolute neutrophil count", "neutrophils absolute", "anc"],
        units: units!["10^3/uL" => "1.5-8.0"],
    },
    ParameterDef {
        name: "Absolute Lymphocytes",
        category: CBC,
        patterns: &["absolute lymphocytes", "absolute lymphocyte count", "lymphocytes absolute", "alc"],
        units: units!["10^3/uL" => "1.0-4.8"],
    },
    ParameterDef {
        name: "Absolute Monocytes",
        category: CBC,
        patterns: &["absolute monocytes", "absolute monocyte count", "monocytes absolute"],
        units: units!["10^3/uL" => "0.2-0.95"],
    },
    ParameterDef {
        name: "Absolute Eosinophils",
        category: CBC,
        patterns: &["absolute eosinophils", "absolute eosinophil count", "eosinophils absolute", "aec"],
        units: units!["10^3/uL" => "0.0-0.5"],
    },
    ParameterDef {
        name: "Absolute Basophils",
        category: CBC,
        patterns: &["absolute basophils", "absolute basophil count", "basophils absolute"],
        units: units!["10^3/uL" => "0.0-0.2"],
    },
    // Metabolic panel
    ParameterDef {
        name: "Sodium",
        category: CMP,
        patterns: &["sodium", "na+", "serum sodium"],
        units: units!["mmol/L" => "135-145", "mEq/L" => "135-145"],
    },
    ParameterDef {
        name: "Potassium",
        category: CMP,
        patterns: &["potassium", "k+", "serum potassium"],
        units: units!["mmol/L" => "3.5-5.0", "mEq/L" => "3.5-5.0"],
    },
    ParameterDef {
        name: "Chloride",
        category: CMP,
        patterns: &["chloride", "cl-", "serum chloride"],
        units: units!["mmol/L" => "98-107", "mEq/L" => "98-107"],
    },
    ParameterDef {
        name: "Bicarbonate",
        category: CMP,
        patterns: &["bicarbonate", "co2", "total co2", "hco3"],
        units: units!["mmol/L" => "22-29", "mEq/L" => "22-29"],
    },
    ParameterDef {
        name: "Blood Urea Nitrogen",
        category: CMP,
        patterns: &["blood urea nitrogen", "urea nitrogen", "bun"],
        units: units!["mg/dL" => "7-20", "mmol/L" => "2.5-7.1"],
    },
    ParameterDef {
        name: "Creatinine",
        category: CMP,
        patterns: &["creatinine", "serum creatinine", "creat"],
        units: units!["mg/dL" => "0.6-1.3", "µmol/L" => "53-115"],
    },
    ParameterDef {
        name: "Calcium",
        category: CMP,
        patterns: &["calcium", "serum calcium", "ca"],
        units: units!["mg/dL" => "8.5-10.5", "mmol/L" => "2.1-2.6"],
    },
    ParameterDef {
        name: "Total Protein",
        category: CMP,
        patterns: &["total protein", "protein, total", "protein total"],
        units: units!["g/dL" => "6.0-8.3"],
    },
    ParameterDef {
        name: "Albumin",
        category: CMP,
        patterns: &["albumin", "serum albumin", "alb"],
        units: units!["g/dL" => "3.5-5.0", "g/L" => "35-50"],
    },
    ParameterDef {
        name: "Total Bilirubin",
        category: CMP,
        patterns: &["total bilirubin", "bilirubin, total", "bilirubin total", "bilirubin", "tbil"],
        units: units!["mg/dL" => "0.1-1.2", "µmol/L" => "2-21"],
    },
    ParameterDef {
        name: "Direct Bilirubin",
        category: CMP,
        patterns: &["direct bilirubin", "bilirubin, direct", "bilirubin direct", "dbil"],
        units: units!["mg/dL" => "0.0-0.3", "µmol/L" => "0-5"],
    },
    ParameterDef {
        name: "AST",
        category: CMP,
        patterns: &["ast", "sgot", "aspartate aminotransferase", "ast (sgot)"],
        units: units!["U/L" => "10-40"],
    },
    ParameterDef {
        name: "ALT",
        category: CMP,
        patterns: &["alt", "sgpt", "alanine aminotransferase", "alt (sgpt)"],
        units: units!["U/L" => "7-56"],
    },
    ParameterDef {
        name: "Alkaline Phosphatase",
        category: CMP,
        patterns: &["alkaline phosphatase", "alk phos", "alp"],
        units: units!["U/L" => "44-147"],
    },
    ParameterDef {
        name: "Uric Acid",
        category: CMP,
        patterns: &["uric acid", "serum uric acid"],
        units: units!["mg/dL" => "3.5-7.2"],
    },
    // Thyroid
    ParameterDef {
        name: "TSH",
        category: THYROID,
        patterns: &["tsh", "thyroid stimulating hormone"],
        units: units!["mIU/L" => "0.4-4.0"],
    },
    // Vitamins and iron stores
    ParameterDef {
        name: "Vitamin D",
        category: VITAMINS,
        patterns: &["vitamin d", "25-hydroxy vitamin d", "25-oh vitamin d", "vitamin d3", "vit d"],
        units: units!["ng/mL" => "30-100"],
    },
    ParameterDef {
        name: "Vitamin B12",
        category: VITAMINS,
        patterns: &["vitamin b12", "vit b12", "cobalamin", "b12"],
        units: units!["pg/mL" => "200-900"],
    },
    ParameterDef {
        name: "Ferritin",
        category: VITAMINS,
        patterns: &["ferritin", "serum ferritin"],
        units: units!["ng/mL" => "20-250"],
    },
];

/// Compiled pattern regexes, one `Vec` per vocabulary row.
static COMPILED: LazyLock<Vec<Vec<Regex>>> = LazyLock::new(|| {
    VOCABULARY
        .iter()
        .map(|def| def.patterns.iter().map(|p| pattern_regex(p)).collect())
        .collect()
});

/// `(?i)` plus word boundaries on the sides that start or end with a word character.
fn pattern_regex(pattern: &str) -> Regex {
    let boundary = |c: Option<char>| {
        if c.is_some_and(char::is_alphanumeric) {
            r"\b"
        } else {
            ""
        }
    };
    let source = format!(
        "(?i){}{}{}",
        boundary(pattern.chars().next()),
        regex::escape(pattern),
        boundary(pattern.chars().last()),
    );
    Regex::new(&source).expect("invalid vocabulary pattern")
}

/// A vocabulary hit on one line.
#[derive(Debug, Clone, Copy)]
pub struct VocabularyMatch {
    pub def: &'static ParameterDef,
    pub start: usize,
    pub end: usize,
}

impl VocabularyMatch {
    fn len(&self) -> usize {
        self.end - self.start
    }

    fn contains(&self, other: &VocabularyMatch) -> bool {
        self.start <= other.start && other.end <= self.end && self.len() > other.len()
    }
}

/// All vocabulary entries found on `line`, with overlapping shorter hits removed
/// ("HDL" inside "Non-HDL Cholesterol", "Hemoglobin" inside "Hemoglobin A1c").
pub fn find_in_line(line: &str) -> Vec<VocabularyMatch> {
    let mut hits: Vec<VocabularyMatch> = Vec::new();

    for (def, regexes) in VOCABULARY.iter().zip(COMPILED.iter()) {
        let best = regexes
            .iter()
            .filter_map(|re| re.find(line))
            .map(|m| VocabularyMatch {
                def,
                start: m.start(),
                end: m.end(),
            })
            .max_by_key(|hit| (hit.len(), std::cmp::Reverse(hit.start)));
        if let Some(hit) = best {
            hits.push(hit);
        }
    }

    let mut kept: Vec<VocabularyMatch> = hits
        .iter()
        .filter(|hit| !hits.iter().any(|other| other.contains(hit)))
        .copied()
        .collect();
    kept.sort_by_key(|hit| hit.start);
    kept
}

/// Vocabulary entry whose pattern equals `name` as a whole (used to canonicalize
/// heuristic matches).
pub fn lookup_exact(name: &str) -> Option<&'static ParameterDef> {
    let needle = name.trim().to_lowercase();
    VOCABULARY
        .iter()
        .find(|def| def.name.eq_ignore_ascii_case(&needle) || def.patterns.contains(&needle.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_pattern_compiles_and_is_lowercase() {
        assert_eq!(COMPILED.len(), VOCABULARY.len());
        for def in VOCABULARY {
            assert!(!def.units.is_empty(), "{} has no units", def.name);
            for p in def.patterns {
                assert_eq!(*p, p.to_lowercase(), "pattern {p:?} not lowercase");
            }
        }
    }

    #[test]
    fn names_are_unique() {
        let mut names: Vec<_> = VOCABULARY.iter().map(|d| d.name).collect();
        names.sort_unstable();
        names.dedup();
        assert_eq!(names.len(), VOCABULARY.len());
    }

    #[test]
    fn longest_overlapping_match_wins() {
        let hits = find_in_line("Non-HDL Cholesterol  140 mg/dL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].def.name, "Non-HDL Cholesterol");

        let hits = find_in_line("Hemoglobin A1c  5.4 %");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].def.name, "HbA1c");

        let hits = find_in_line("MCHC 33 g/dL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].def.name, "MCHC");
    }

    #[test]
    fn word_boundaries_are_respected() {
        assert!(find_in_line("Last visit was fine").is_empty());
        assert!(find_in_line("Alternative medicine").is_empty());
        let hits = find_in_line("VLDL Cholesterol 25 mg/dL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].def.name, "VLDL Cholesterol");
    }

    #[test]
    fn bare_cholesterol_defers_to_specific_fractions() {
        let hits = find_in_line("Cholesterol  195  mg/dL");
        assert_eq!(hits[0].def.name, "Total Cholesterol");
        let hits = find_in_line("LDL Cholesterol  95  mg/dL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].def.name, "LDL Cholesterol");
        let hits = find_in_line("Direct Bilirubin 0.2 mg/dL");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].def.name, "Direct Bilirubin");
    }

    #[test]
    fn symbol_patterns_match() {
        let hits = find_in_line("K+ 4.1 mmol/L");
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].def.name, "Potassium");
    }

    #[test]
    fn accepted_units_and_ranges() {
        let glucose = lookup_exact("glucose").unwrap();
        assert!(glucose.accepts_unit("mg/dL"));
        assert!(!glucose.accepts_unit("%"));
        assert_eq!(glucose.range_for("mg/dL"), Some("70-100"));
        assert_eq!(lookup_exact("Total Cholesterol").unwrap().name, "Total Cholesterol");
        assert_eq!(lookup_exact("WBC").unwrap().name, "White Blood Cells");
        assert!(lookup_exact("Patient Name").is_none());
    }
}
