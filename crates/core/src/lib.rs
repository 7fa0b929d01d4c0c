//! Core scoring types and the lexical metrics (ROUGE, BLEU, exact match).
//! No models, no network.

pub mod bleu;
pub mod config;
pub mod error;
pub mod exact;
pub mod normalize;
pub mod rouge;
pub mod texts;
pub mod tokenize;

use std::collections::BTreeMap;

use serde::Serialize;

pub use bleu::{bleu, BleuOrder};
pub use config::{BackendKind, Config, ModelDef};
pub use error::{Result, ScoreError};
pub use exact::{exact_match, quasi_exact_match};
pub use normalize::normalize_text;
pub use rouge::{rouge, RougeVariant};
pub use texts::Texts;

/// Output of a scoring call.
///
/// Ranges are metric-defined: match metrics give 0 or 1, ROUGE and BLEU stay
/// in `[0, 1]`, embedding and model metrics document their own range.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum ScoreResult {
    /// Match metrics: 0 or 1.
    Integer(u8),
    Scalar(f64),
    Vector(Vec<f64>),
    /// Named sub-scores, e.g. toxicity categories.
    Breakdown(BTreeMap<String, f64>),
    /// Named per-example sequences, e.g. BERTScore precision/recall/F1.
    Batched(BTreeMap<String, Vec<f64>>),
}

impl ScoreResult {
    #[must_use]
    pub fn as_scalar(&self) -> Option<f64> {
        match self {
            Self::Scalar(v) => Some(*v),
            Self::Integer(v) => Some(f64::from(*v)),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_integer(&self) -> Option<u8> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Short name of the result shape, for logging.
    #[must_use]
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Integer(_) => "integer",
            Self::Scalar(_) => "scalar",
            Self::Vector(_) => "vector",
            Self::Breakdown(_) => "breakdown",
            Self::Batched(_) => "batched",
        }
    }
}

impl From<u8> for ScoreResult {
    fn from(v: u8) -> Self {
        Self::Integer(v)
    }
}

impl From<f64> for ScoreResult {
    fn from(v: f64) -> Self {
        Self::Scalar(v)
    }
}
