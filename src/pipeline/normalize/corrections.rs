//! Ordered regex correction table for recurring OCR misreadings.
//!
//! Every replacement is a fixed point of the whole table: running it over its
//! own output changes nothing.

use std::sync::LazyLock;

use regex::Regex;

struct Correction {
    pattern: Regex,
    replacement: &'static str,
}

fn rule(pattern: &str, replacement: &'static str) -> Correction {
    Correction {
        pattern: Regex::new(pattern).expect("invalid correction regex"),
        replacement,
    }
}

/// Separator between the two halves of a unit: slash with optional spaces.
macro_rules! sep {
    () => {
        r"[ \t]*/[ \t]*"
    };
}

static CORRECTIONS: LazyLock<Vec<Correction>> = LazyLock::new(|| {
    vec![
        // Unit misreadings and spacing
        rule(r"(?i)\bmg/ol\b\.?", "mg/dL"),
        rule(concat!(r"(?i)\bmg(?:", sep!(), r"|[ \t]+)?d[l1]\b"), "mg/dL"),
        rule(concat!(r"(?i)\b(?:g|gm)(?:", sep!(), r"|[ \t]+)d[l1]\b"), "g/dL"),
        rule(concat!(r"(?i)\bmmol", sep!(), r"l\b"), "mmol/L"),
        rule(concat!(r"(?i)\bmeq", sep!(), r"l\b"), "mEq/L"),
        rule(concat!(r"(?i)(?:\bu|µ)mol", sep!(), r"l\b"), "µmol/L"),
        rule(concat!(r"(?i)\biu", sep!(), r"l\b"), "IU/L"),
        rule(concat!(r"(?i)\bu", sep!(), r"l\b"), "U/L"),
        rule(concat!(r"(?i)\bmiu", sep!(), r"l\b"), "mIU/L"),
        rule(concat!(r"(?i)\bng", sep!(), r"ml\b"), "ng/mL"),
        rule(concat!(r"(?i)\bpg", sep!(), r"ml\b"), "pg/mL"),
        rule(concat!(r"(?i)10[ \t]*[\^*][ \t]*3", sep!(), r"[uµ]l\b"), "10^3/uL"),
        rule(concat!(r"(?i)10[ \t]*[\^*][ \t]*6", sep!(), r"[uµ]l\b"), "10^6/uL"),
        // Analyte misreadings
        rule(r"(?i)\bcholesterol\.[ \t]*total\b", "Cholesterol, Total"),
        rule(r"(?i)\btrglycendeos\b", "Triglycerides"),
        rule(r"(?i)\bleu[ \t]+ocyte", "Leukocyte"),
        rule(r"(?i)\bg1ucose\b", "Glucose"),
        rule(r"(?i)\bhba[1il]c\b", "HbA1c"),
        rule(r"\b[Tt]0ta[l1]\b", "Total"),
        // Decimal point read as a space, only in front of a known unit
        rule(
            r"(^|[^\d.])(\d+) (\d{1,2})( +(?:mg/dL|g/dL|mmol/L|mEq/L|µmol/L|U/L|IU/L|ng/mL|pg/mL|fL|pg|%))",
            "${1}${2}.${3}${4}",
        ),
    ]
});

/// Apply the correction table in order.
pub fn apply_corrections(text: &str) -> String {
    text.lines()
        .map(|line| {
            CORRECTIONS.iter().fold(line.to_string(), |acc, correction| {
                correction
                    .pattern
                    .replace_all(&acc, correction.replacement)
                    .into_owned()
            })
        })
        .collect::<Vec<_>>()
        .join("\n")
}
