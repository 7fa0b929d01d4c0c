//! Sentence-level BLEU with all weight on one n-gram order.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use tracing::trace;

use crate::error::{Result, ScoreError};
use crate::texts::Texts;
use crate::tokenize::word_tokenize;

/// The single n-gram order that carries all of the BLEU weight.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum BleuOrder {
    #[default]
    Bleu1,
    Bleu2,
    Bleu3,
    Bleu4,
}

impl BleuOrder {
    #[must_use]
    pub const fn n(&self) -> usize {
        match self {
            Self::Bleu1 => 1,
            Self::Bleu2 => 2,
            Self::Bleu3 => 3,
            Self::Bleu4 => 4,
        }
    }

    /// # Errors
    ///
    /// Returns `InvalidArgument` unless `n` is in `1..=4`.
    pub fn from_n(n: usize) -> Result<Self> {
        match n {
            1 => Ok(Self::Bleu1),
            2 => Ok(Self::Bleu2),
            3 => Ok(Self::Bleu3),
            4 => Ok(Self::Bleu4),
            other => Err(ScoreError::invalid(format!(
                "bleu order {other} is not supported (expected 1, 2, 3 or 4)"
            ))),
        }
    }
}

impl fmt::Display for BleuOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "bleu{}", self.n())
    }
}

impl FromStr for BleuOrder {
    type Err = eyre::Report;

    /// Accepts `bleu1`..`bleu4` or a bare `1`..`4`.
    fn from_str(s: &str) -> Result<Self> {
        let digits = s.strip_prefix("bleu").unwrap_or(s);
        match digits.parse::<usize>() {
            Ok(n) => Self::from_n(n),
            Err(_) => Err(ScoreError::invalid(format!(
                "bleu type '{s}' is not one of bleu1, bleu2, bleu3, bleu4"
            ))),
        }
    }
}

/// Sentence BLEU of `prediction` against one or more references, in `[0, 1]`.
///
/// Every reference is tokenized on its own; a prediction n-gram is credited up
/// to the largest count it has in any single reference.
///
/// # Errors
///
/// Returns `InvalidArgument` if `order` is outside `1..=4`.
pub fn bleu(references: impl Into<Texts>, prediction: &str, order: usize) -> Result<f64> {
    let order = BleuOrder::from_n(order)?;
    Ok(bleu_with(references, prediction, order))
}

/// Same as [`bleu`] for an already-validated order.
#[must_use]
pub fn bleu_with(references: impl Into<Texts>, prediction: &str, order: BleuOrder) -> f64 {
    let references = references.into();
    let references: Vec<Vec<String>> = references
        .as_slice()
        .iter()
        .map(|r| word_tokenize(r))
        .collect();
    let hypothesis = word_tokenize(prediction);
    let score = sentence_bleu(&references, &hypothesis, order.n());
    trace!(%order, score, refs = references.len(), "bleu scored");
    score
}

fn sentence_bleu(references: &[Vec<String>], hypothesis: &[String], n: usize) -> f64 {
    if hypothesis.is_empty() || references.is_empty() {
        return 0.0;
    }

    // No unigram in common means zero regardless of the requested order.
    let (unigram_hits, _) = clipped_matches(references, hypothesis, 1);
    if unigram_hits == 0 {
        return 0.0;
    }

    let (hits, total) = clipped_matches(references, hypothesis, n);
    if hits == 0 {
        return 0.0;
    }
    let precision = hits as f64 / total.max(1) as f64;

    brevity_penalty(references, hypothesis.len()) * precision
}

/// Clipped n-gram hits and total hypothesis n-grams.
fn clipped_matches(references: &[Vec<String>], hypothesis: &[String], n: usize) -> (usize, usize) {
    let hyp_counts = ngram_counts(hypothesis, n);
    if hyp_counts.is_empty() {
        return (0, 0);
    }

    let mut max_ref_counts: HashMap<&[String], usize> = HashMap::new();
    for reference in references {
        for (gram, count) in ngram_counts(reference, n) {
            if hyp_counts.contains_key(gram) {
                let slot = max_ref_counts.entry(gram).or_insert(0);
                *slot = (*slot).max(count);
            }
        }
    }

    let hits = hyp_counts
        .iter()
        .map(|(gram, &count)| count.min(max_ref_counts.get(gram).copied().unwrap_or(0)))
        .sum();
    let total = hyp_counts.values().sum();
    (hits, total)
}

fn ngram_counts(tokens: &[String], n: usize) -> HashMap<&[String], usize> {
    let mut counts = HashMap::new();
    if tokens.len() >= n {
        for gram in tokens.windows(n) {
            *counts.entry(gram).or_insert(0) += 1;
        }
    }
    counts
}

/// Reference length closest to `hyp_len`; ties go to the shorter reference.
fn closest_ref_len(references: &[Vec<String>], hyp_len: usize) -> usize {
    references
        .iter()
        .map(Vec::len)
        .min_by_key(|&len| (len.abs_diff(hyp_len), len))
        .unwrap_or(0)
}

fn brevity_penalty(references: &[Vec<String>], hyp_len: usize) -> f64 {
    let ref_len = closest_ref_len(references, hyp_len);
    if hyp_len > ref_len {
        1.0
    } else if hyp_len == 0 {
        0.0
    } else {
        (1.0 - ref_len as f64 / hyp_len as f64).exp()
    }
}
