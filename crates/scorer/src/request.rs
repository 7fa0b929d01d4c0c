use std::path::PathBuf;

use deepscore_core::{Config, Result, ScoreError, Texts};
use serde::Deserialize;

/// Arguments for one scoring call.
///
/// Which fields a metric reads depends on the metric; `variant` carries the
/// metric's discrete choice (ROUGE variant, BLEU order, relevancy model type,
/// faithfulness granularity, toxicity variant).
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ScoreRequest {
    pub target: Option<Texts>,
    pub prediction: Option<Texts>,
    pub variant: Option<String>,
    pub model: Option<String>,
    pub device: Option<String>,
    /// BERTScore: language of the texts, selects the installed baseline.
    pub lang: Option<String>,
    /// Answer relevancy: report only the first prediction's score.
    pub first_only: bool,
    /// BERTScore: baseline file to rescale with, instead of the installed one.
    pub baseline: Option<PathBuf>,
    /// BERTScore: report raw cosine similarities.
    pub raw: bool,
}

impl ScoreRequest {
    #[must_use]
    pub fn new(target: impl Into<Texts>, prediction: impl Into<Texts>) -> Self {
        Self {
            target: Some(target.into()),
            prediction: Some(prediction.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_variant(mut self, variant: impl Into<String>) -> Self {
        self.variant = Some(variant.into());
        self
    }

    #[must_use]
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    #[must_use]
    pub fn with_device(mut self, device: impl Into<String>) -> Self {
        self.device = Some(device.into());
        self
    }

    pub(crate) fn target_texts(&self) -> Result<&Texts> {
        self.target
            .as_ref()
            .ok_or_else(|| ScoreError::invalid("missing required field 'target'"))
    }

    pub(crate) fn prediction_texts(&self) -> Result<&Texts> {
        self.prediction
            .as_ref()
            .ok_or_else(|| ScoreError::invalid("missing required field 'prediction'"))
    }

    pub(crate) fn target_str(&self) -> Result<&str> {
        one("target", self.target_texts()?)
    }

    pub(crate) fn prediction_str(&self) -> Result<&str> {
        one("prediction", self.prediction_texts()?)
    }

    pub(crate) fn model(&self) -> Option<&str> {
        self.model.as_deref()
    }

    pub(crate) fn variant(&self) -> Option<&str> {
        self.variant.as_deref().map(str::trim).filter(|v| !v.is_empty())
    }

    /// `config` with the request's device taking precedence.
    pub(crate) fn config(&self, config: &Config) -> Config {
        let mut config = config.clone();
        if let Some(device) = &self.device {
            config.device = Some(device.clone());
        }
        config
    }
}

fn one<'a>(field: &str, texts: &'a Texts) -> Result<&'a str> {
    match texts.as_slice() {
        [text] => Ok(text.as_str()),
        other => Err(ScoreError::invalid(format!(
            "'{field}' must be a single string, got {} texts",
            other.len()
        ))),
    }
}
