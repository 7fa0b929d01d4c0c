//! ROUGE n-gram and longest-common-subsequence overlap.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use regex::Regex;
use rust_stemmers::{Algorithm, Stemmer};
use tracing::trace;

use crate::error::{Result, ScoreError};

static NON_ALNUM: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[^a-z0-9]+").expect("non-alnum pattern should compile"));

static STEMMER: LazyLock<Stemmer> = LazyLock::new(|| Stemmer::create(Algorithm::English));

/// Tokens shorter than this are left unstemmed.
const MIN_STEM_LEN: usize = 4;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RougeVariant {
    /// Unigram overlap (`rouge1`).
    Unigram,
    /// Bigram overlap (`rouge2`).
    Bigram,
    /// Longest common subsequence (`rougeL`).
    Lcs,
}

impl RougeVariant {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Unigram => "rouge1",
            Self::Bigram => "rouge2",
            Self::Lcs => "rougeL",
        }
    }
}

impl fmt::Display for RougeVariant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for RougeVariant {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "rouge1" => Ok(Self::Unigram),
            "rouge2" => Ok(Self::Bigram),
            "rougeL" => Ok(Self::Lcs),
            other => Err(ScoreError::invalid(format!(
                "rouge variant '{other}' is not one of rouge1, rouge2, rougeL"
            ))),
        }
    }
}

/// Precision, recall and F-measure of one ROUGE comparison.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RougeScore {
    pub precision: f64,
    pub recall: f64,
    pub fmeasure: f64,
}

impl RougeScore {
    const ZERO: Self = Self {
        precision: 0.0,
        recall: 0.0,
        fmeasure: 0.0,
    };

    fn from_counts(overlap: usize, target_total: usize, prediction_total: usize) -> Self {
        let precision = overlap as f64 / prediction_total.max(1) as f64;
        let recall = overlap as f64 / target_total.max(1) as f64;
        Self {
            precision,
            recall,
            fmeasure: fmeasure(precision, recall),
        }
    }
}

fn fmeasure(precision: f64, recall: f64) -> f64 {
    if precision + recall > 0.0 {
        2.0 * precision * recall / (precision + recall)
    } else {
        0.0
    }
}

/// F-measure of the chosen ROUGE variant, in `[0, 1]`.
///
/// Both texts are lowercased, reduced to alphanumeric tokens and stemmed.
/// Stemming is Snowball English (Porter2), so a few words stem differently
/// from the original Porter stemmer used by `rouge_score`, and scores on
/// such words can differ slightly from it.
///
/// # Errors
///
/// Returns `InvalidArgument` if `variant` is not `rouge1`, `rouge2` or `rougeL`.
pub fn rouge(target: &str, prediction: &str, variant: &str) -> Result<f64> {
    let variant: RougeVariant = variant.parse()?;
    let score = rouge_detail(target, prediction, variant);
    trace!(%variant, fmeasure = score.fmeasure, "rouge scored");
    Ok(score.fmeasure)
}

/// Full precision/recall/F breakdown for an already-validated variant.
#[must_use]
pub fn rouge_detail(target: &str, prediction: &str, variant: RougeVariant) -> RougeScore {
    let target = rouge_tokens(target);
    let prediction = rouge_tokens(prediction);
    match variant {
        RougeVariant::Unigram => ngram_overlap(&target, &prediction, 1),
        RougeVariant::Bigram => ngram_overlap(&target, &prediction, 2),
        RougeVariant::Lcs => lcs_overlap(&target, &prediction),
    }
}

/// Lowercased, alphanumeric-only, stemmed tokens.
#[must_use]
pub fn rouge_tokens(text: &str) -> Vec<String> {
    let lowered = text.to_lowercase();
    NON_ALNUM
        .replace_all(&lowered, " ")
        .split_whitespace()
        .map(|tok| {
            if tok.len() >= MIN_STEM_LEN {
                STEMMER.stem(tok).into_owned()
            } else {
                tok.to_string()
            }
        })
        .collect()
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

fn ngram_overlap(target: &[String], prediction: &[String], n: usize) -> RougeScore {
    let target_grams = ngram_counts(target, n);
    let prediction_grams = ngram_counts(prediction, n);

    let overlap: usize = target_grams
        .iter()
        .map(|(gram, &count)| count.min(prediction_grams.get(gram).copied().unwrap_or(0)))
        .sum();

    RougeScore::from_counts(
        overlap,
        target_grams.values().sum(),
        prediction_grams.values().sum(),
    )
}

fn lcs_overlap(target: &[String], prediction: &[String]) -> RougeScore {
    if target.is_empty() || prediction.is_empty() {
        return RougeScore::ZERO;
    }
    let lcs = lcs_len(target, prediction);
    RougeScore::from_counts(lcs, target.len(), prediction.len())
}

/// Length of the longest common subsequence, two-row dynamic programming.
fn lcs_len(a: &[String], b: &[String]) -> usize {
    let mut prev = vec![0usize; b.len() + 1];
    let mut curr = vec![0usize; b.len() + 1];
    for x in a {
        for (j, y) in b.iter().enumerate() {
            curr[j + 1] = if x == y {
                prev[j] + 1
            } else {
                prev[j + 1].max(curr[j])
            };
        }
        std::mem::swap(&mut prev, &mut curr);
    }
    prev[b.len()]
}
