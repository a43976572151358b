//! Value/unit/range reading around a located parameter name.
//!
//! Line shapes are tried in a fixed priority order; the first one that yields
//! a finite value and a unit the vocabulary entry accepts wins.

use std::sync::LazyLock;

use regex::Regex;

use super::units::canonical_unit;
use super::vocabulary::ParameterDef;

macro_rules! number {
    () => {
        r"(?:\d{1,3}(?:,\d{3})+(?:\.\d+)?|\d+(?:\.\d+)?)"
    };
}

/// Numeric value, non-negative by construction. Thousands separators are
/// accepted ("4,500") and dropped by [`parse_value`].
pub const NUMBER: &str = number!();

/// Unit-like token: exponent counts, percent, or letters/slashes.
pub const UNIT_TOKEN: &str = r"(?:x\s?)?10[\^*]\d/[uµ][lL]|%|[A-Za-zµ/][A-Za-zµ/0-9^*]*";

/// Reference range: `<max`, `>min` or `min-max`.
pub const RANGE: &str = concat!(
    r"[<>≤≥]\s*",
    number!(),
    "|",
    number!(),
    r"\s*-\s*",
    number!(),
);

/// Optional abnormal flag printed between value and unit.
pub(crate) const FLAG: &str = r"(?:\s*\b(?:H|L|HH|LL|High|Low)\b)?";

/// Qualifier directly after the name: "(calc)", "(SGOT)", ", Fasting".
const QUALIFIER: &str = r"(?:\s*\([^)]*\)|,\s*[A-Za-z]+)?";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LineShape {
    /// name, spaces (or pipes), value, unit, range
    Spaced,
    /// name: value unit
    Colon,
    /// name - value unit
    Dash,
    /// value unit name
    Leading,
}

impl LineShape {
    /// Confidence multiplier; the reversed shape is the least reliable.
    pub fn weight(&self) -> f64 {
        match self {
            Self::Leading => 0.95,
            _ => 1.0,
        }
    }
}

struct ShapeRegex {
    shape: LineShape,
    regex: Regex,
}

fn trailing(shape: LineShape, separator: &str) -> ShapeRegex {
    let source = format!(
        r"^{QUALIFIER}{separator}(?P<value>{NUMBER}){FLAG}[\s|]*(?P<unit>{UNIT_TOKEN})(?:[\s|]+\(?(?P<range>{RANGE})\)?)?"
    );
    ShapeRegex {
        shape,
        regex: Regex::new(&source).expect("invalid value shape regex"),
    }
}

static TRAILING_SHAPES: LazyLock<Vec<ShapeRegex>> = LazyLock::new(|| {
    vec![
        trailing(LineShape::Spaced, r"[\s|]+"),
        trailing(LineShape::Colon, r"\s*[:=]\s*"),
        trailing(LineShape::Dash, r"\s*-\s*"),
    ]
});

static LEADING_SHAPE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(
        r"(?:^|\s)(?P<value>{NUMBER})\s*(?P<unit>{UNIT_TOKEN})\s+$"
    ))
    .expect("invalid leading shape regex")
});

static RANGE_AFTER_NAME: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(&format!(r"^{QUALIFIER}[\s|]+\(?(?P<range>{RANGE})\)?"))
        .expect("invalid range regex")
});

/// A value read from a line.
#[derive(Debug, Clone, PartialEq)]
pub struct ValueReading {
    pub value: f64,
    /// Canonical unit.
    pub unit: &'static str,
    pub raw_range: Option<String>,
    pub shape: LineShape,
}

/// Read the value for `def`, whose name occupies `line[start..end]`.
pub fn read_value(line: &str, start: usize, end: usize, def: &ParameterDef) -> Option<ValueReading> {
    let after = &line[end..];

    for shape in TRAILING_SHAPES.iter() {
        let Some(caps) = shape.regex.captures(after) else {
            continue;
        };
        if let Some(reading) = accept(def, &caps["value"], &caps["unit"], shape.shape) {
            let raw_range = caps.name("range").map(|m| compact_range(m.as_str()));
            return Some(ValueReading {
                raw_range,
                ..reading
            });
        }
    }

    let before = &line[..start];
    let caps = LEADING_SHAPE.captures(before)?;
    let reading = accept(def, &caps["value"], &caps["unit"], LineShape::Leading)?;
    let raw_range = RANGE_AFTER_NAME
        .captures(after)
        .map(|c| compact_range(&c["range"]));
    Some(ValueReading {
        raw_range,
        ..reading
    })
}

fn accept(def: &ParameterDef, value: &str, unit: &str, shape: LineShape) -> Option<ValueReading> {
    let value = parse_value(value)?;
    let unit = canonical_unit(unit).filter(|u| def.accepts_unit(u))?;
    Some(ValueReading {
        value,
        unit,
        raw_range: None,
        shape,
    })
}

/// Parse a captured number, rejecting non-finite results.
pub fn parse_value(raw: &str) -> Option<f64> {
    raw.replace(',', "")
        .parse::<f64>()
        .ok()
        .filter(|v| v.is_finite() && *v >= 0.0)
}

/// Drop inner whitespace and thousands separators from a range
/// ("70 - 100" → "70-100", "4,500-11,000" → "4500-11000").
pub fn compact_range(raw: &str) -> String {
    raw.chars().filter(|c| !c.is_whitespace() && *c != ',').collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::parameters::vocabulary::find_in_line;

    fn read(line: &str) -> Option<ValueReading> {
        let hit = find_in_line(line).into_iter().next()?;
        read_value(line, hit.start, hit.end, hit.def)
    }

    #[test]
    fn spaced_columns_with_range() {
        let r = read("Total Cholesterol  195  mg/dL  <200").unwrap();
        assert_eq!(r.value, 195.0);
        assert_eq!(r.unit, "mg/dL");
        assert_eq!(r.raw_range.as_deref(), Some("<200"));
        assert_eq!(r.shape, LineShape::Spaced);
    }

    #[test]
    fn colon_shape_without_range() {
        let r = read("Glucose: 130 mg/dL").unwrap();
        assert_eq!(r.value, 130.0);
        assert_eq!(r.raw_range, None);
        assert_eq!(r.shape, LineShape::Colon);
    }

    #[test]
    fn dash_shape() {
        let r = read("Sodium - 140 mmol/L (135 - 145)").unwrap();
        assert_eq!(r.value, 140.0);
        assert_eq!(r.raw_range.as_deref(), Some("135-145"));
        assert_eq!(r.shape, LineShape::Dash);
    }

    #[test]
    fn leading_value_shape() {
        let r = read("5.4 % HbA1c 4.0-5.6").unwrap();
        assert_eq!(r.value, 5.4);
        assert_eq!(r.unit, "%");
        assert_eq!(r.raw_range.as_deref(), Some("4.0-5.6"));
        assert_eq!(r.shape, LineShape::Leading);
    }

    #[test]
    fn pipes_flags_and_qualifiers() {
        let r = read("Platelets | 250 | 10^3/uL | 150-450").unwrap();
        assert_eq!(r.value, 250.0);
        assert_eq!(r.unit, "10^3/uL");

        let r = read("Glucose, Fasting  130 H mg/dL  70-100").unwrap();
        assert_eq!(r.value, 130.0);
        assert_eq!(r.raw_range.as_deref(), Some("70-100"));

        let r = read("AST (SGOT)  32  U/L  10-40").unwrap();
        assert_eq!(r.value, 32.0);
        assert_eq!(r.unit, "U/L");
    }

    #[test]
    fn unit_must_be_accepted() {
        assert!(read("Glucose  130  %").is_none());
        assert!(read("Glucose  130").is_none());
        assert!(read("Glucose tolerance test").is_none());
    }

    #[test]
    fn thousands_separators_are_read_whole() {
        let r = read("WBC  4,500  /uL  4,500-11,000").unwrap();
        assert_eq!(r.value, 4500.0);
        assert_eq!(r.unit, "/uL");
        assert_eq!(r.raw_range.as_deref(), Some("4500-11000"));

        assert_eq!(parse_value("250,000"), Some(250_000.0));
        assert_eq!(parse_value("1,234.5"), Some(1234.5));
    }

    #[test]
    fn unit_aliases_are_accepted() {
        let r = read("WBC  7.2  K/uL  4.5-11.0").unwrap();
        assert_eq!(r.unit, "10^3/uL");
        let r = read("Sodium  140  mEq/L").unwrap();
        assert_eq!(r.unit, "mEq/L");
    }
}
