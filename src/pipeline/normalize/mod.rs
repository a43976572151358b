//! Text normalization ahead of parameter extraction.
//!
//! Pure and deterministic. Steps, in order: look-alike folding and character
//! filtering, whitespace collapsing, digit repair, dictionary correction of
//! analyte names, then the regex correction table.

pub mod corrections;
pub mod medical_correction;
pub mod sanitize;

pub use corrections::apply_corrections;
pub use medical_correction::{correct_lab_terms, edit_distance, similarity};
pub use sanitize::{collapse_whitespace, fix_digit_letter_o, sanitize_report_text};

/// Normalize raw recognized text. Idempotent.
pub fn normalize(raw: &str) -> String {
    let text = sanitize_report_text(raw);
    let text = collapse_whitespace(&text);
    let text = fix_digit_letter_o(&text);
    let text = correct_lab_terms(&text);
    apply_corrections(&text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};

    const CORPUS: &[&str] = &[
        "Total Cholesterol  195  mg/dL  <200",
        "Glucose: 130 mg/dL",
        "HDL Cholesterol   52 mg / dl   >40",
        "Hemoglobin 14 5 g/dL (13.5-17.5)",
        "Trglycendeos 120 mg/ol. <150",
        "Cholesterol. Total 210 mgdl",
        "WBC\t7.2\tx10^3/ul\t4.5-11.0",
        "Sodium 140 mEq / L 135-145",
        "Creatiniue 1.1 mg/dl 0.6-1.3",
        "Leu ocyte count 6.1",
        "Patient: John Doe  Age: 45",
        "HbAlc 5 4 % 4.0-5.6",
        "Platelets | 250 | 10 ^ 3/uL | 150-450",
        "ALT 1O2 U/L 7-56",
    ];

    const NOISE: &[&str] = &[
        " ", "  ", "\t", "\n", "\n\n", "»", "«", "O", "o", "0", "1", "l", "I", ".", ",", ":",
        "-", "/", "\x00", "\x07", "\u{2013}", "μ", "µ", "|", "^", "mg", "dl", " mg / dl ",
        "\r\n", "\u{00A0}", "x", "%", "<", ">",
    ];

    fn inject_noise(rng: &mut StdRng, line: &str) -> String {
        let mut chars: Vec<String> = line.chars().map(String::from).collect();
        let edits = rng.gen_range(0..6);
        for _ in 0..edits {
            let pos = rng.gen_range(0..=chars.len());
            match rng.gen_range(0..3) {
                0 => chars.insert(pos, NOISE[rng.gen_range(0..NOISE.len())].to_string()),
                1 if pos < chars.len() => {
                    chars.remove(pos);
                }
                _ if pos < chars.len() => {
                    chars[pos] = NOISE[rng.gen_range(0..NOISE.len())].to_string();
                }
                _ => {}
            }
        }
        chars.concat()
    }

    #[test]
    fn normalize_is_idempotent_under_injected_ocr_noise() {
        let mut rng = StdRng::seed_from_u64(0x1ab5);
        for _ in 0..800 {
            let lines = rng.gen_range(1..5);
            let raw: Vec<String> = (0..lines)
                .map(|_| {
                    let line = CORPUS[rng.gen_range(0..CORPUS.len())];
                    inject_noise(&mut rng, line)
                })
                .collect();
            let raw = raw.join("\n");

            let once = normalize(&raw);
            let twice = normalize(&once);
            assert_eq!(once, twice, "not idempotent for input {raw:?}");
        }
    }

    #[test]
    fn normalize_is_idempotent_on_corpus() {
        for line in CORPUS {
            let once = normalize(line);
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn normalizes_typical_report_lines() {
        let raw = "  Total Cholesterol     195   mg / dl   <200  \n\n\nTrglycendeos\t150 mg/ol.\n";
        assert_eq!(
            normalize(raw),
            "Total Cholesterol  195  mg/dL  <200\nTriglycerides  150 mg/dL"
        );
    }

    #[test]
    fn repairs_digits_and_decimals() {
        assert_eq!(normalize("ALT 1O2 U/L"), "ALT 102 U/L");
        assert_eq!(normalize("Hemoglobin 14 5 g/dl"), "Hemoglobin 14.5 g/dL");
    }

    #[test]
    fn empty_input_stays_empty() {
        assert_eq!(normalize(""), "");
        assert_eq!(normalize(" \n\t \n"), "");
    }
}
