use std::sync::LazyLock;

use regex::Regex;

use super::value::read_value;
use super::vocabulary::{find_in_line, VocabularyMatch, VOCABULARY};
use super::{confidence, vocabulary_candidate, ExtractionStrategy};
use crate::models::{ParameterCandidate, SourceMethod};
use crate::pipeline::normalize::similarity;

static WORD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[A-Za-zµ][A-Za-z0-9µ+\-]*").expect("invalid word regex"));

/// Pattern words shorter than this must match exactly.
const MIN_FUZZY_WORD_LEN: usize = 4;

/// Vocabulary match tolerant of misspelt words.
pub struct FuzzyMatch {
    /// Per-word similarity threshold.
    pub similarity: f64,
    /// Fraction of a pattern's words that must find a similar word on the line.
    pub word_ratio: f64,
}

impl Default for FuzzyMatch {
    fn default() -> Self {
        Self {
            similarity: 0.8,
            word_ratio: 0.7,
        }
    }
}

impl FuzzyMatch {
    fn word_matches(&self, pattern_word: &str, line_word: &str) -> bool {
        if pattern_word.chars().count() < MIN_FUZZY_WORD_LEN {
            return pattern_word.eq_ignore_ascii_case(line_word);
        }
        similarity(pattern_word, line_word) >= self.similarity
    }

    /// Best fuzzy span for one pattern on a line, as (start, end, matched ratio).
    fn match_pattern(&self, pattern: &str, words: &[(usize, usize, &str)]) -> Option<(usize, usize, f64)> {
        let pattern_words: Vec<&str> = pattern
            .split(|c: char| c.is_whitespace() || matches!(c, ',' | '(' | ')'))
            .filter(|w| !w.is_empty())
            .collect();
        let mut span: Option<(usize, usize)> = None;
        let mut matched = 0usize;

        for pattern_word in &pattern_words {
            let Some(&(start, end, _)) = words
                .iter()
                .find(|(_, _, word)| self.word_matches(pattern_word, word))
            else {
                continue;
            };
            matched += 1;
            span = Some(match span {
                Some((s, e)) => (s.min(start), e.max(end)),
                None => (start, end),
            });
        }

        let ratio = matched as f64 / pattern_words.len().max(1) as f64;
        let (start, end) = span?;
        (ratio >= self.word_ratio).then_some((start, end, ratio))
    }

    fn hits_on_line(&self, line: &str) -> Vec<VocabularyMatch> {
        let words: Vec<(usize, usize, &str)> = WORD
            .find_iter(line)
            .map(|m| (m.start(), m.end(), m.as_str()))
            .collect();
        if words.is_empty() {
            return Vec::new();
        }

        let exact = find_in_line(line);
        let mut fuzzy: Vec<VocabularyMatch> = Vec::new();
        for def in VOCABULARY {
            if exact.iter().any(|hit| std::ptr::eq(hit.def, def)) {
                continue;
            }
            let best = def
                .patterns
                .iter()
                .filter_map(|p| self.match_pattern(p, &words))
                .max_by(|a, b| a.2.total_cmp(&b.2).then((a.1 - a.0).cmp(&(b.1 - b.0))));
            if let Some((start, end, _)) = best {
                fuzzy.push(VocabularyMatch { def, start, end });
            }
        }

        // A fuzzy span lying inside any other, longer hit belongs to that hit.
        let all: Vec<VocabularyMatch> = exact.iter().chain(fuzzy.iter()).copied().collect();
        fuzzy
            .into_iter()
            .filter(|hit| {
                !all.iter().any(|other| {
                    other.start <= hit.start
                        && hit.end <= other.end
                        && (other.end - other.start) > (hit.end - hit.start)
                })
            })
            .collect()
    }
}

impl ExtractionStrategy for FuzzyMatch {
    fn method(&self) -> SourceMethod {
        SourceMethod::Fuzzy
    }

    fn extract(&self, lines: &[&str]) -> Vec<ParameterCandidate> {
        let mut candidates = Vec::new();
        for (index, line) in lines.iter().enumerate() {
            for hit in self.hits_on_line(line) {
                if let Some(reading) = read_value(line, hit.start, hit.end, hit.def) {
                    let score =
                        confidence::EXACT * confidence::FUZZY_MULTIPLIER * reading.shape.weight();
                    candidates.push(vocabulary_candidate(
                        hit.def,
                        reading,
                        index,
                        score,
                        SourceMethod::Fuzzy,
                    ));
                }
            }
        }
        candidates
    }
}
