/// Fold OCR look-alike characters onto the ASCII forms the parser expects.
fn fold_lookalike(c: char) -> char {
    match c {
        '»' => '>',
        '«' => '<',
        '\u{2013}' | '\u{2014}' | '\u{2212}' => '-',
        'μ' => 'µ',
        '\u{00A0}' => ' ',
        _ => c,
    }
}

/// Strip control characters and anything outside the lab-report alphabet,
/// trim every line and drop empty ones.
pub fn sanitize_report_text(raw: &str) -> String {
    raw.chars()
        .map(fold_lookalike)
        .filter(|c| {
            c.is_alphanumeric()
                || c.is_whitespace()
                || matches!(
                    c,
                    '.' | ','
                        | ';'
                        | ':'
                        | '-'
                        | '/'
                        | '('
                        | ')'
                        | '['
                        | ']'
                        | '+'
                        | '='
                        | '%'
                        | '#'
                        | '\''
                        | '*'
                        | '^'
                        | '|'
                        | '<'
                        | '>'
                        | '≤'
                        | '≥'
                        | '°'
                        | 'µ'
                )
        })
        .collect::<String>()
        .lines()
        .map(|l| l.trim())
        .filter(|l| !l.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Collapse horizontal whitespace inside each line.
///
/// A run containing a tab or two or more whitespace characters becomes exactly
/// two spaces so column gaps stay recognisable; a single character becomes one space.
pub fn collapse_whitespace(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut run = 0usize;
    let mut run_has_tab = false;

    let flush = |out: &mut String, run: usize, has_tab: bool| {
        if run >= 2 || has_tab {
            out.push_str("  ");
        } else if run == 1 {
            out.push(' ');
        }
    };

    for c in text.chars() {
        if c != '\n' && c.is_whitespace() {
            run += 1;
            run_has_tab |= c == '\t';
            continue;
        }
        flush(&mut out, run, run_has_tab);
        run = 0;
        run_has_tab = false;
        out.push(c);
    }
    flush(&mut out, run, run_has_tab);
    out
}

/// Replace a letter O read between two digits with a zero ("1O5" → "105").
pub fn fix_digit_letter_o(text: &str) -> String {
    let chars: Vec<char> = text.chars().collect();
    chars
        .iter()
        .enumerate()
        .map(|(i, &c)| {
            let between_digits = i > 0
                && i + 1 < chars.len()
                && chars[i - 1].is_ascii_digit()
                && chars[i + 1].is_ascii_digit();
            if between_digits && matches!(c, 'O' | 'o') {
                '0'
            } else {
                c
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strips_control_characters() {
        let raw = "Glucose: 95\x01\x02\x03 mg/dL\nDate: 2024-01-15";
        let clean = sanitize_report_text(raw);
        assert!(!clean.contains('\x01'));
        assert!(clean.contains("95 mg/dL"));
        assert!(clean.contains("2024-01-15"));
    }

    #[test]
    fn folds_guillemets_and_dashes() {
        let clean = sanitize_report_text("HDL »40  range 70\u{2013}100");
        assert_eq!(clean, "HDL >40  range 70-100");
    }

    #[test]
    fn keeps_table_and_exponent_marks() {
        let clean = sanitize_report_text("WBC | 7.2 | 10^3/uL");
        assert_eq!(clean, "WBC | 7.2 | 10^3/uL");
    }

    #[test]
    fn collapses_blank_lines_and_trims() {
        let raw = "  Line one  \n\n\n\nLine two\n\n";
        assert_eq!(sanitize_report_text(raw), "Line one\nLine two");
    }

    #[test]
    fn only_control_chars_returns_empty() {
        assert_eq!(sanitize_report_text("\x00\x01\x02"), "");
    }

    #[test]
    fn whitespace_runs_keep_column_signal() {
        assert_eq!(collapse_whitespace("a     b"), "a  b");
        assert_eq!(collapse_whitespace("a\tb"), "a  b");
        assert_eq!(collapse_whitespace("a b"), "a b");
        assert_eq!(collapse_whitespace("a  b\nc   d"), "a  b\nc  d");
    }

    #[test]
    fn letter_o_between_digits() {
        assert_eq!(fix_digit_letter_o("1O5 mg"), "105 mg");
        assert_eq!(fix_digit_letter_o("2o0"), "200");
        assert_eq!(fix_digit_letter_o("Oxygen 1O"), "Oxygen 1O");
        assert_eq!(fix_digit_letter_o("1OO1"), "1OO1");
    }
}
