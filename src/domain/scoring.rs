// ============================================================
// Layer 3 — Span Scoring
// ============================================================
// The official SQuAD metrics plus span selection from logits.
//
// Normalisation (applied identically to prediction and gold):
//   1. lowercase
//   2. drop ASCII punctuation characters
//   3. drop the articles "a", "an", "the" as whole words
//   4. collapse runs of whitespace to one space and trim
//
// EM is 1 when the normalised strings are equal.
// F1 is the harmonic mean of token precision and recall over
// the MULTISET of normalised tokens.
//
// Reference: Rajpurkar et al. (2016) SQuAD, official evaluate script

use std::collections::HashMap;

use crate::domain::error::{QaError, Result};

const ARTICLES: [&str; 3] = ["a", "an", "the"];

/// Canonical form used before every comparison.
pub fn normalize(text: &str) -> String {
    let lowered = text.to_lowercase();
    let without_punct: String = lowered
        .chars()
        .filter(|c| !c.is_ascii_punctuation())
        .collect();

    without_punct
        .split_whitespace()
        .filter(|w| !ARTICLES.contains(w))
        .collect::<Vec<_>>()
        .join(" ")
}

pub fn exact_match(prediction: &str, gold: &str) -> bool {
    normalize(prediction) == normalize(gold)
}

/// `exact_match` as a 0.0 / 1.0 score so it composes with
/// `max_over_references`.
pub fn exact_match_score(prediction: &str, gold: &str) -> f64 {
    if exact_match(prediction, gold) { 1.0 } else { 0.0 }
}

pub fn token_f1(prediction: &str, gold: &str) -> f64 {
    let pred_norm = normalize(prediction);
    let gold_norm = normalize(gold);
    let pred_tokens: Vec<&str> = pred_norm.split_whitespace().collect();
    let gold_tokens: Vec<&str> = gold_norm.split_whitespace().collect();

    match (pred_tokens.is_empty(), gold_tokens.is_empty()) {
        (true, true)           => return 1.0,
        (true, _) | (_, true)  => return 0.0,
        _ => {}
    }

    let mut gold_counts: HashMap<&str, usize> = HashMap::new();
    for t in &gold_tokens {
        *gold_counts.entry(t).or_insert(0) += 1;
    }

    // Each predicted token consumes one matching gold occurrence,
    // so the overlap is min(count_pred, count_gold) per token.
    let mut common = 0usize;
    for t in &pred_tokens {
        if let Some(n) = gold_counts.get_mut(t) {
            if *n > 0 {
                *n -= 1;
                common += 1;
            }
        }
    }

    if common == 0 {
        return 0.0;
    }
    let precision = common as f64 / pred_tokens.len() as f64;
    let recall    = common as f64 / gold_tokens.len() as f64;
    2.0 * precision * recall / (precision + recall)
}

/// Best score of `metric` over every accepted gold answer.
/// An empty gold list is rejected rather than scored as 0.
pub fn max_over_references<F, S>(metric: F, prediction: &str, golds: &[S]) -> Result<f64>
where
    F: Fn(&str, &str) -> f64,
    S: AsRef<str>,
{
    golds
        .iter()
        .map(|g| metric(prediction, g.as_ref()))
        .reduce(f64::max)
        .ok_or(QaError::EmptyReferences)
}

/// Pick the answer span from per-token start/end logits.
///
/// start = first argmax of start_logits[0..valid_length]
/// end   = first argmax of end_logits[start..valid_length]
///
/// Searching for the end from the chosen start guarantees
/// start ≤ end. `valid_length` is clamped to [1, logits length].
pub fn predicted_span(start_logits: &[f32], end_logits: &[f32], valid_length: usize) -> (usize, usize) {
    if start_logits.is_empty() || end_logits.is_empty() {
        return (0, 0);
    }
    let limit = valid_length
        .min(start_logits.len())
        .min(end_logits.len())
        .max(1);

    let start = first_argmax(&start_logits[..limit]);
    let end   = start + first_argmax(&end_logits[start..limit]);
    (start, end)
}

/// Index of the largest value, lowest index on ties. NaN never wins.
fn first_argmax(values: &[f32]) -> usize {
    let mut best_idx = 0usize;
    let mut best_val = f32::NEG_INFINITY;
    for (i, &v) in values.iter().enumerate() {
        if v > best_val {
            best_val = v;
            best_idx = i;
        }
    }
    best_idx
}
