//! Candidate deduplication.

use std::cmp::Ordering;
use std::collections::{BTreeMap, HashSet};

use crate::models::ParameterCandidate;

/// Better candidate first: confidence, then strategy rank, then earlier line.
fn preference(a: &ParameterCandidate, b: &ParameterCandidate) -> Ordering {
    b.confidence
        .total_cmp(&a.confidence)
        .then(a.source_method.rank().cmp(&b.source_method.rank()))
        .then(a.line.cmp(&b.line))
}

/// Keep one candidate per (name, value), then let vocabulary-backed readings of a
/// name shadow heuristic readings of the same name with other values.
pub fn merge(candidates: Vec<ParameterCandidate>) -> Vec<ParameterCandidate> {
    let mut groups: BTreeMap<(String, u64), ParameterCandidate> = BTreeMap::new();
    for candidate in candidates {
        let key = (candidate.name.clone(), candidate.value.to_bits());
        let replace = groups
            .get(&key)
            .map_or(true, |kept| preference(kept, &candidate) == Ordering::Greater);
        if replace {
            groups.insert(key, candidate);
        }
    }

    let backed: HashSet<String> = groups
        .values()
        .filter(|c| c.source_method.is_vocabulary_backed())
        .map(|c| c.name.clone())
        .collect();

    let mut merged: Vec<ParameterCandidate> = groups
        .into_values()
        .filter(|c| c.source_method.is_vocabulary_backed() || !backed.contains(&c.name))
        .collect();
    merged.sort_by(|a, b| a.line.cmp(&b.line).then_with(|| a.name.cmp(&b.name)));
    merged
}
