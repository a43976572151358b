//! Dictionary-based correction of analyte names garbled by OCR.
//!
//! Only corrects when confident: edit distance <= 2, purely alphabetic words of
//! at least 5 letters, and a single closest dictionary term.

/// Lab analyte dictionary. Sorted for binary search, lowercase.
const LAB_TERMS: &[&str] = &[
    "albumin", "alkaline", "basophils", "bicarbonate", "bilirubin",
    "calcium", "chloride", "cholesterol", "creatinine", "eosinophils",
    "ferritin", "globulin", "glucose", "hematocrit", "hemoglobin",
    "leukocyte", "leukocytes", "lymphocytes", "monocytes", "neutrophils",
    "phosphatase", "platelets", "potassium", "protein", "sodium",
    "thyroid", "triglycerides", "vitamin",
];

/// Correct garbled analyte names in `text`, leaving everything else untouched.
pub fn correct_lab_terms(text: &str) -> String {
    let mut result = String::with_capacity(text.len());
    let mut word_buf = String::new();

    for ch in text.chars() {
        if ch.is_alphanumeric() {
            word_buf.push(ch);
        } else {
            if !word_buf.is_empty() {
                result.push_str(&try_correct_word(&word_buf));
                word_buf.clear();
            }
            result.push(ch);
        }
    }

    if !word_buf.is_empty() {
        result.push_str(&try_correct_word(&word_buf));
    }

    result
}

fn try_correct_word(word: &str) -> String {
    let len = word.chars().count();
    if len < 5 || !word.chars().all(char::is_alphabetic) {
        return word.to_string();
    }

    let lower = word.to_lowercase();
    if LAB_TERMS.binary_search(&lower.as_str()).is_ok() {
        return word.to_string();
    }

    let mut best_term: Option<&str> = None;
    let mut best_distance = 3u32;
    let mut ambiguous = false;

    for &term in LAB_TERMS {
        if len.abs_diff(term.len()) > 2 {
            continue;
        }

        let dist = edit_distance(&lower, term);
        if dist < best_distance {
            best_distance = dist;
            best_term = Some(term);
            ambiguous = false;
        } else if dist == best_distance && best_term.is_some() {
            ambiguous = true;
        }
    }

    match best_term {
        Some(term) if !ambiguous => preserve_case(word, term),
        _ => word.to_string(),
    }
}

fn preserve_case(original: &str, correction: &str) -> String {
    if original.chars().all(|c| c.is_uppercase() || !c.is_alphabetic()) {
        return correction.to_uppercase();
    }

    let first_upper = original.chars().next().is_some_and(|c| c.is_uppercase());
    if first_upper {
        let mut chars = correction.chars();
        match chars.next() {
            Some(c) => {
                let mut s = c.to_uppercase().to_string();
                s.extend(chars);
                s
            }
            None => correction.to_string(),
        }
    } else {
        correction.to_string()
    }
}

/// Levenshtein edit distance over chars.
pub fn edit_distance(a: &str, b: &str) -> u32 {
    let a_chars: Vec<char> = a.chars().collect();
    let b_chars: Vec<char> = b.chars().collect();
    let m = a_chars.len();
    let n = b_chars.len();

    if m == 0 {
        return n as u32;
    }
    if n == 0 {
        return m as u32;
    }

    let mut prev: Vec<u32> = (0..=n as u32).collect();
    let mut curr = vec![0u32; n + 1];

    for (i, &a_ch) in a_chars.iter().enumerate() {
        curr[0] = (i + 1) as u32;
        for (j, &b_ch) in b_chars.iter().enumerate() {
            let cost = u32::from(a_ch != b_ch);
            curr[j + 1] = (prev[j + 1] + 1).min(curr[j] + 1).min(prev[j] + cost);
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    prev[n]
}

/// Case-insensitive similarity in [0, 1]: `1 - distance / longer_length`.
pub fn similarity(a: &str, b: &str) -> f64 {
    let a = a.to_lowercase();
    let b = b.to_lowercase();
    let longest = a.chars().count().max(b.chars().count());
    if longest == 0 {
        return 1.0;
    }
    1.0 - f64::from(edit_distance(&a, &b)) / longest as f64
}
