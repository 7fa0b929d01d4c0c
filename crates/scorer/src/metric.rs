use std::fmt;
use std::str::FromStr;

use deepscore_core::ScoreError;

/// Every metric in the built-in catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Metric {
    Rouge,
    Bleu,
    ExactMatch,
    QuasiExactMatch,
    BertScore,
    Faithfulness,
    Hallucination,
    AnswerRelevancy,
    FactualConsistency,
    NeuralToxicity,
    NeuralBias,
    Pii,
}

impl Metric {
    pub const ALL: [Self; 12] = [
        Self::Rouge,
        Self::Bleu,
        Self::ExactMatch,
        Self::QuasiExactMatch,
        Self::BertScore,
        Self::Faithfulness,
        Self::Hallucination,
        Self::AnswerRelevancy,
        Self::FactualConsistency,
        Self::NeuralToxicity,
        Self::NeuralBias,
        Self::Pii,
    ];

    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Rouge => "rouge",
            Self::Bleu => "bleu",
            Self::ExactMatch => "exact_match",
            Self::QuasiExactMatch => "quasi_exact_match",
            Self::BertScore => "bert_score",
            Self::Faithfulness => "faithfulness",
            Self::Hallucination => "hallucination",
            Self::AnswerRelevancy => "answer_relevancy",
            Self::FactualConsistency => "factual_consistency",
            Self::NeuralToxicity => "neural_toxicity",
            Self::NeuralBias => "neural_bias",
            Self::Pii => "pii",
        }
    }

    /// Whether scoring needs a model download and inference.
    #[must_use]
    pub const fn is_model_based(&self) -> bool {
        !matches!(
            self,
            Self::Rouge | Self::Bleu | Self::ExactMatch | Self::QuasiExactMatch | Self::Pii
        )
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|m| m.as_str() == s)
            .ok_or_else(|| ScoreError::invalid(format!("unknown metric '{s}'")))
    }
}
