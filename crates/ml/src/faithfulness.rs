//! Zero-shot summary consistency (`SummaC`-ZS).
//!
//! The source and the summary are split into blocks and an NLI model scores
//! every (source block, summary block) pair. A summary block scores the
//! highest entailment probability over the source blocks minus the highest
//! contradiction probability. The result is the mean over summary blocks, so
//! it lies in `[-1, 1]`.

use deepscore_core::{Config, Result, ScoreError};
use tracing::{debug, instrument, trace};

use crate::backend::Task;
use crate::device::Device;
use crate::math;
use crate::model::{Model, TextModel};
use crate::segment::{self, Granularity};

pub const METRIC: &str = "faithfulness";
pub const DEFAULT_MODEL: &str = "vitc";

const ENTAILMENT: &[&str] = &["entailment", "supports"];
const CONTRADICTION: &[&str] = &["contradiction", "refutes"];

/// Resolve the short model names accepted for the NLI model.
#[must_use]
pub fn resolve_alias(name: &str) -> &str {
    match name {
        "vitc" => "tals/albert-xlarge-vitaminc-mnli",
        "vitc-base" => "tals/albert-base-vitaminc-mnli",
        "mnli" => "roberta-large-mnli",
        other => other,
    }
}

#[derive(Debug, Clone, Default)]
pub struct FaithfulnessOptions {
    pub model: Option<String>,
    pub granularity: Granularity,
    pub device: Option<String>,
}

/// Faithfulness of `prediction` (the summary) to `target` (the source).
///
/// # Errors
///
/// Returns `InvalidArgument` for a bad device or a model without NLI labels,
/// `BackendUnavailable` when the model cannot be acquired, or the backend's
/// error.
#[instrument(skip_all, fields(granularity = %opts.granularity))]
pub fn faithfulness(
    target: &str,
    prediction: &str,
    opts: &FaithfulnessOptions,
    config: &Config,
) -> Result<f64> {
    let device = Device::resolve(opts.device.as_deref().or(config.device.as_deref()))?;
    let mut def = config.model_for(METRIC, opts.model.as_deref(), DEFAULT_MODEL);
    def.repo = resolve_alias(&def.repo).to_string();
    let mut model = Model::load(&def, config, device, Task::Classify)?;
    faithfulness_with(&mut model, target, prediction, opts.granularity)
}

/// [`faithfulness`] on an already-loaded NLI model.
///
/// # Errors
///
/// Returns `InvalidArgument` if the model has no entailment/contradiction
/// labels, or the model's error.
pub fn faithfulness_with<M: TextModel + ?Sized>(
    model: &mut M,
    target: &str,
    prediction: &str,
    granularity: Granularity,
) -> Result<f64> {
    let labels = model.labels();
    let (Some(entail), Some(contradict)) = (labels.index_of(ENTAILMENT), labels.index_of(CONTRADICTION))
    else {
        return Err(ScoreError::invalid(format!(
            "faithfulness needs an NLI model with entailment and contradiction labels, got {:?}",
            labels.names()
        )));
    };

    let sources = segment::blocks(target, granularity);
    let summary = segment::blocks(prediction, granularity);
    if sources.is_empty() || summary.is_empty() {
        debug!("nothing to compare");
        return Ok(0.0);
    }

    let mut total = 0.0;
    for hypothesis in &summary {
        let (mut entailed, mut contradicted) = (0.0f64, 0.0f64);
        for premise in &sources {
            let probs = math::softmax(&model.pair_logits(premise, hypothesis)?);
            let (Some(e), Some(c)) = (probs.get(entail), probs.get(contradict)) else {
                return Err(eyre::eyre!(
                    "NLI model returned {} logits, labels need {}",
                    probs.len(),
                    entail.max(contradict) + 1
                ));
            };
            entailed = entailed.max(*e);
            contradicted = contradicted.max(*c);
        }
        let block = entailed - contradicted;
        trace!(block = hypothesis, entailed, contradicted, score = block, "summary block scored");
        total += block;
    }

    #[allow(clippy::cast_precision_loss)]
    let score = total / summary.len() as f64;
    debug!(score, blocks = summary.len(), "faithfulness done");
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeModel;

    const NLI: &[&str] = &["contradiction", "neutral", "entailment"];

    /// Entails when the premise contains the hypothesis, contradicts when the
    /// hypothesis mentions "never", neutral otherwise.
    fn nli(premise: &str, hypothesis: &str) -> Vec<f32> {
        let h = hypothesis.trim_end_matches('.');
        if h.contains("never") {
            vec![10.0, 0.0, 0.0]
        } else if premise.contains(h) {
            vec![0.0, 0.0, 10.0]
        } else {
            vec![0.0, 10.0, 0.0]
        }
    }

    #[test]
    fn supported_summary_scores_high() {
        let mut model = FakeModel::cross(NLI, nli);
        let score = faithfulness_with(
            &mut model,
            "The cat sat on the mat. It was sunny.",
            "It was sunny.",
            Granularity::Sentence,
        )
        .unwrap();
        assert!(score > 0.99);
    }

    #[test]
    fn averages_over_summary_blocks() {
        let mut model = FakeModel::cross(NLI, nli);
        let score = faithfulness_with(
            &mut model,
            "The cat sat on the mat.",
            "The cat sat on the mat. The cat never sat.",
            Granularity::Sentence,
        )
        .unwrap();
        assert!(score.abs() < 0.01, "got {score}");
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn conflicting_source_blocks_cancel_out() {
        fn verdicts(premise: &str, _hypothesis: &str) -> Vec<f32> {
            if premise.starts_with("Alpha") {
                vec![0.0, 0.0, 20.0]
            } else {
                vec![20.0, 0.0, 0.0]
            }
        }
        let mut model = FakeModel::cross(NLI, verdicts);
        let score = faithfulness_with(
            &mut model,
            "Alpha holds. Beta fails.",
            "claim.",
            Granularity::Sentence,
        )
        .unwrap();
        assert!(score.abs() < 1e-6, "got {score}");
        assert_eq!(model.calls(), 2);
    }

    #[test]
    fn document_granularity_is_one_pair() {
        let mut model = FakeModel::cross(NLI, nli);
        faithfulness_with(&mut model, "a. b. c.", "a. b.", Granularity::Document).unwrap();
        assert_eq!(model.calls(), 1);
    }

    #[test]
    fn empty_summary_scores_zero() {
        let mut model = FakeModel::cross(NLI, nli);
        let score = faithfulness_with(&mut model, "source.", "  ", Granularity::Sentence).unwrap();
        assert_eq!(score, 0.0);
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn vitaminc_labels_are_recognised() {
        let mut model = FakeModel::cross(&["SUPPORTS", "REFUTES", "NOT ENOUGH INFO"], |_, _| {
            vec![0.0, 10.0, 0.0]
        });
        let score = faithfulness_with(&mut model, "x.", "y.", Granularity::Sentence).unwrap();
        assert!(score < -0.99);
    }

    #[test]
    fn non_nli_model_is_invalid() {
        let mut model = FakeModel::classifier(&["Non-biased", "Biased"], |_| vec![0.0, 0.0]);
        let err = faithfulness_with(&mut model, "a.", "b.", Granularity::Sentence).unwrap_err();
        assert!(matches!(
            ScoreError::of(&err),
            Some(ScoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn aliases_resolve() {
        assert_eq!(resolve_alias("vitc"), "tals/albert-xlarge-vitaminc-mnli");
        assert_eq!(resolve_alias("mnli"), "roberta-large-mnli");
        assert_eq!(resolve_alias("org/custom"), "org/custom");
    }
}
