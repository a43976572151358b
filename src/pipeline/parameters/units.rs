//! Unit alias table. Raw unit tokens are compacted (lowercased, whitespace
//! removed, micro signs unified) and looked up here.

/// (compact alias, canonical display form)
const UNIT_ALIASES: &[(&str, &str)] = &[
    ("mg/dl", "mg/dL"),
    ("mgdl", "mg/dL"),
    ("mg/ol", "mg/dL"),
    ("g/dl", "g/dL"),
    ("gm/dl", "g/dL"),
    ("gdl", "g/dL"),
    ("g/l", "g/L"),
    ("mg/l", "mg/L"),
    ("ng/dl", "ng/dL"),
    ("mmol/l", "mmol/L"),
    ("mmoll", "mmol/L"),
    ("meq/l", "mEq/L"),
    ("µmol/l", "µmol/L"),
    ("umol/l", "µmol/L"),
    ("u/l", "U/L"),
    ("iu/l", "U/L"),
    ("miu/l", "mIU/L"),
    ("uiu/ml", "mIU/L"),
    ("µiu/ml", "mIU/L"),
    ("ng/ml", "ng/mL"),
    ("pg/ml", "pg/mL"),
    ("%", "%"),
    ("fl", "fL"),
    ("pg", "pg"),
    ("10^3/ul", "10^3/uL"),
    ("x10^3/ul", "10^3/uL"),
    ("10*3/ul", "10^3/uL"),
    ("k/ul", "10^3/uL"),
    ("thou/ul", "10^3/uL"),
    ("10^6/ul", "10^6/uL"),
    ("x10^6/ul", "10^6/uL"),
    ("10*6/ul", "10^6/uL"),
    ("m/ul", "10^6/uL"),
    ("mill/ul", "10^6/uL"),
    ("/ul", "/uL"),
    ("cells/ul", "/uL"),
    ("mm/hr", "mm/hr"),
];

fn compact(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace())
        .map(|c| if c == 'μ' { 'µ' } else { c })
        .collect::<String>()
        .to_lowercase()
        .trim_end_matches(['.', ','])
        .to_string()
}

/// Canonical form of a known unit, `None` when the token is not a recognised unit.
pub fn canonical_unit(raw: &str) -> Option<&'static str> {
    let key = compact(raw);
    // Lowercasing turns the micro sign into itself but the Greek capital into μ.
    let key = key.replace('μ', "µ");
    UNIT_ALIASES
        .iter()
        .find(|(alias, _)| *alias == key)
        .map(|(_, canonical)| *canonical)
}

/// Canonical form when known, otherwise the trimmed raw token.
pub fn display_unit(raw: &str) -> String {
    canonical_unit(raw)
        .map(str::to_string)
        .unwrap_or_else(|| raw.trim().to_string())
}

/// Whether a token at least looks like a unit (contains a slash, percent or
/// exponent) even if it is not in the alias table.
pub fn is_unit_like(raw: &str) -> bool {
    canonical_unit(raw).is_some()
        || (raw.len() <= 12
            && raw.chars().any(|c| matches!(c, '/' | '%' | '^'))
            && raw.chars().any(|c| c.is_alphabetic() || c == '%'))
}
