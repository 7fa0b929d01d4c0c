//! Multi-label toxicity classification.

use std::collections::BTreeMap;

use deepscore_core::{Config, Result, ScoreError};
use tracing::{debug, instrument};

use crate::backend::Task;
use crate::device::Device;
use crate::math;
use crate::model::{Model, TextModel};

pub const METRIC: &str = "neural_toxicity";
pub const DEFAULT_VARIANT: &str = "original";

/// Repository for a named variant; anything containing `/` is taken as a repo id.
///
/// # Errors
///
/// Returns `InvalidArgument` for unknown variant names.
pub fn variant_repo(variant: &str) -> Result<&str> {
    match variant {
        "original" => Ok("unitary/toxic-bert"),
        "unbiased" => Ok("unitary/unbiased-toxic-roberta"),
        "multilingual" => Ok("unitary/multilingual-toxic-xlm-roberta"),
        repo if repo.contains('/') => Ok(repo),
        other => Err(ScoreError::invalid(format!(
            "toxicity variant '{other}' is not one of original, unbiased, multilingual"
        ))),
    }
}

fn category(label: &str) -> String {
    match label {
        "toxic" => "toxicity".to_string(),
        "severe_toxic" => "severe_toxicity".to_string(),
        "identity_hate" => "identity_attack".to_string(),
        other => other.to_string(),
    }
}

/// Independent probability in `[0, 1]` for every toxicity category the
/// model knows about.
///
/// # Errors
///
/// Returns `InvalidArgument` for unknown variants (before any model is
/// loaded), `BackendUnavailable` when the model cannot be acquired, or the
/// backend's error.
#[instrument(skip_all, fields(variant = variant.unwrap_or(DEFAULT_VARIANT)))]
pub fn neural_toxicity(
    prediction: &str,
    variant: Option<&str>,
    config: &Config,
) -> Result<BTreeMap<String, f64>> {
    let requested = variant.map(variant_repo).transpose()?;
    let device = Device::resolve(config.device.as_deref())?;
    let def = config.model_for(METRIC, requested, variant_repo(DEFAULT_VARIANT)?);
    let mut model = Model::load(&def, config, device, Task::Classify)?;
    neural_toxicity_with(&mut model, prediction)
}

/// [`neural_toxicity`] on an already-loaded classifier.
///
/// # Errors
///
/// Propagates the model's error.
pub fn neural_toxicity_with<M: TextModel + ?Sized>(
    model: &mut M,
    prediction: &str,
) -> Result<BTreeMap<String, f64>> {
    let logits = model.logits(prediction)?;
    let labels = model.labels();
    let scores: BTreeMap<String, f64> = logits
        .iter()
        .enumerate()
        .map(|(i, &logit)| (category(&labels.name(i)), math::sigmoid(logit)))
        .collect();
    debug!(categories = scores.len(), "neural_toxicity done");
    Ok(scores)
}

#[cfg(test)]
mod tests {
    use super::*;

    use crate::testing::FakeModel;

    #[test]
    fn variants_resolve() {
        assert_eq!(variant_repo("original").unwrap(), "unitary/toxic-bert");
        assert_eq!(variant_repo("me/my-tox").unwrap(), "me/my-tox");
        let err = variant_repo("spicy").unwrap_err();
        assert!(matches!(
            ScoreError::of(&err),
            Some(ScoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn sigmoid_per_label() {
        let mut model = FakeModel::classifier(
            &["toxic", "severe_toxic", "obscene", "threat", "insult", "identity_hate"],
            |_| vec![4.0, -4.0, 0.0, -4.0, -4.0, -4.0],
        );
        let scores = neural_toxicity_with(&mut model, "text").unwrap();
        assert_eq!(scores.len(), 6);
        assert!(scores["toxicity"] > 0.95);
        assert!(scores["severe_toxicity"] < 0.05);
        assert!((scores["obscene"] - 0.5).abs() < 1e-12);
        assert!(scores.contains_key("identity_attack"));
    }

    #[test]
    fn unlabeled_outputs_get_generic_names() {
        let mut model = FakeModel::classifier(&[], |_| vec![0.0, 0.0]);
        let scores = neural_toxicity_with(&mut model, "text").unwrap();
        assert_eq!(
            scores.keys().collect::<Vec<_>>(),
            ["LABEL_0", "LABEL_1"]
        );
    }

    #[test]
    fn unknown_variant_fails_before_loading() {
        let err = neural_toxicity("x", Some("spicy"), &Config::default()).unwrap_err();
        assert!(matches!(
            ScoreError::of(&err),
            Some(ScoreError::InvalidArgument(_))
        ));
    }
}
