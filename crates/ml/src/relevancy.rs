//! Answer relevancy with a cross-encoder or a bi-encoder.

use std::fmt;
use std::str::FromStr;

use deepscore_core::{Config, Result, ScoreError, Texts};
use serde::Serialize;
use tracing::{debug, instrument, trace};

use crate::backend::Task;
use crate::device::Device;
use crate::math;
use crate::model::{Model, TextModel};

pub const METRIC: &str = "answer_relevancy";
pub const CROSS_ENCODER_MODEL: &str = "cross-encoder/ms-marco-MiniLM-L-6-v2";
pub const SELF_ENCODER_MODEL: &str = "sentence-transformers/multi-qa-MiniLM-L6-cos-v1";

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ModelType {
    /// Embed target and predictions separately, compare by dot product.
    SelfEncoder,
    /// Score the (prediction, target) pair jointly.
    #[default]
    CrossEncoder,
}

impl ModelType {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::SelfEncoder => "self_encoder",
            Self::CrossEncoder => "cross_encoder",
        }
    }

    const fn default_model(self) -> &'static str {
        match self {
            Self::SelfEncoder => SELF_ENCODER_MODEL,
            Self::CrossEncoder => CROSS_ENCODER_MODEL,
        }
    }
}

impl fmt::Display for ModelType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ModelType {
    type Err = eyre::Report;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "self_encoder" => Ok(Self::SelfEncoder),
            "cross_encoder" => Ok(Self::CrossEncoder),
            other => Err(ScoreError::invalid(format!(
                "model_type can be either 'self_encoder' or 'cross_encoder', got '{other}'"
            ))),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct RelevancyOptions {
    pub model_type: ModelType,
    pub model: Option<String>,
    pub device: Option<String>,
    /// Surface only the first prediction's score (self-encoder mode).
    pub first_only: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Relevancy {
    Score(f64),
    Scores(Vec<f64>),
}

impl Relevancy {
    /// The first (or only) score.
    #[must_use]
    pub fn first(&self) -> Option<f64> {
        match self {
            Self::Score(s) => Some(*s),
            Self::Scores(v) => v.first().copied(),
        }
    }
}

fn check_shape(predictions: &Texts, model_type: ModelType) -> Result<()> {
    match model_type {
        ModelType::CrossEncoder if !predictions.is_single() => Err(ScoreError::invalid(
            "cross_encoder compares one prediction with one target; pass a single string",
        )),
        ModelType::SelfEncoder if predictions.is_empty() => {
            Err(ScoreError::invalid("self_encoder needs at least one prediction"))
        }
        _ => Ok(()),
    }
}

/// Relevancy of `predictions` to `target`.
///
/// Cross-encoder mode returns `Relevancy::Score`, a sigmoid probability.
/// Self-encoder mode returns one dot-product score per prediction (cosine
/// similarity for normalized embeddings), or only the first when
/// `first_only` is set.
///
/// # Errors
///
/// Returns `InvalidArgument` when cross-encoder mode gets a sequence, before
/// any model is loaded; `BackendUnavailable` when the model cannot be
/// acquired; or the backend's error.
#[instrument(skip_all, fields(model_type = %opts.model_type))]
pub fn answer_relevancy(
    predictions: impl Into<Texts>,
    target: &str,
    opts: &RelevancyOptions,
    config: &Config,
) -> Result<Relevancy> {
    let predictions = predictions.into();
    check_shape(&predictions, opts.model_type)?;

    let device = Device::resolve(opts.device.as_deref().or(config.device.as_deref()))?;
    let def = config.model_for(
        METRIC,
        opts.model.as_deref(),
        opts.model_type.default_model(),
    );
    let task = match opts.model_type {
        ModelType::CrossEncoder => Task::Classify,
        ModelType::SelfEncoder => Task::Embed,
    };
    let mut model = Model::load(&def, config, device, task)?;
    answer_relevancy_with(&mut model, &predictions, target, opts)
}

/// [`answer_relevancy`] on an already-loaded model.
///
/// # Errors
///
/// Same shape errors as [`answer_relevancy`], or the model's error.
pub fn answer_relevancy_with<M: TextModel + ?Sized>(
    model: &mut M,
    predictions: &Texts,
    target: &str,
    opts: &RelevancyOptions,
) -> Result<Relevancy> {
    check_shape(predictions, opts.model_type)?;

    let result = match opts.model_type {
        ModelType::CrossEncoder => {
            let prediction = predictions.first().unwrap_or_default();
            let logits = model.pair_logits(prediction, target)?;
            let Some(&logit) = logits.first() else {
                return Err(eyre::eyre!("cross-encoder returned no logits"));
            };
            Relevancy::Score(math::sigmoid(logit))
        }
        ModelType::SelfEncoder => {
            let query = model.sentence_embedding(target)?;
            let mut scores = Vec::with_capacity(predictions.len());
            for prediction in predictions.as_slice() {
                let doc = model.sentence_embedding(prediction)?;
                let score = math::dot(&query, &doc);
                trace!(score, "prediction scored");
                scores.push(score);
            }
            if opts.first_only {
                Relevancy::Score(scores[0])
            } else {
                Relevancy::Scores(scores)
            }
        }
    };
    debug!(?result, "answer_relevancy done");
    Ok(result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeModel;

    #[test]
    fn parses_model_type() {
        assert_eq!(
            "self_encoder".parse::<ModelType>().unwrap(),
            ModelType::SelfEncoder
        );
        assert_eq!(ModelType::default(), ModelType::CrossEncoder);
        let err = "bi_encoder".parse::<ModelType>().unwrap_err();
        assert!(matches!(
            ScoreError::of(&err),
            Some(ScoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn cross_encoder_rejects_sequences_before_loading() {
        let config = Config {
            offline: true,
            ..Config::default()
        };
        let err = answer_relevancy(
            vec!["a", "b"],
            "query",
            &RelevancyOptions::default(),
            &config,
        )
        .unwrap_err();
        assert!(matches!(
            ScoreError::of(&err),
            Some(ScoreError::InvalidArgument(_))
        ));
    }

    #[test]
    fn cross_encoder_rejects_one_element_sequence() {
        let mut model = FakeModel::default();
        let preds = Texts::from(vec!["only"]);
        let err = answer_relevancy_with(&mut model, &preds, "q", &RelevancyOptions::default())
            .unwrap_err();
        assert!(ScoreError::of(&err).is_some());
        assert_eq!(model.calls(), 0);
    }

    #[test]
    fn cross_encoder_scores_pair() {
        let mut model = FakeModel::cross(&[], |p, _| vec![if p == "good" { 4.0 } else { -4.0 }]);
        let opts = RelevancyOptions::default();
        let good = answer_relevancy_with(&mut model, &"good".into(), "q", &opts).unwrap();
        let bad = answer_relevancy_with(&mut model, &"bad".into(), "q", &opts).unwrap();
        assert!(good.first().unwrap() > 0.9);
        assert!(bad.first().unwrap() < 0.1);
    }

    #[test]
    fn self_encoder_scores_every_prediction() {
        let mut model = FakeModel::default();
        let opts = RelevancyOptions {
            model_type: ModelType::SelfEncoder,
            ..RelevancyOptions::default()
        };
        let preds = Texts::from(vec!["cat sat", "zzz"]);
        let result = answer_relevancy_with(&mut model, &preds, "cat sat", &opts).unwrap();
        let Relevancy::Scores(scores) = result else {
            panic!("expected a score per prediction");
        };
        assert_eq!(scores.len(), 2);
        assert!((scores[0] - 1.0).abs() < 1e-5);
        assert!(scores[1] < scores[0]);
    }

    #[test]
    fn self_encoder_first_only() {
        let mut model = FakeModel::default();
        let opts = RelevancyOptions {
            model_type: ModelType::SelfEncoder,
            first_only: true,
            ..RelevancyOptions::default()
        };
        let preds = Texts::from(vec!["zzz", "cat"]);
        let result = answer_relevancy_with(&mut model, &preds, "cat", &opts).unwrap();
        assert!(matches!(result, Relevancy::Score(s) if s < 0.5));
    }

    #[test]
    fn self_encoder_accepts_a_lone_string() {
        let mut model = FakeModel::default();
        let opts = RelevancyOptions {
            model_type: ModelType::SelfEncoder,
            ..RelevancyOptions::default()
        };
        let result = answer_relevancy_with(&mut model, &"cat".into(), "cat", &opts).unwrap();
        assert_eq!(result.first().map(|s| (s * 1e4).round()), Some(1e4));
    }
}
