//! Factual consistency against one or more supporting contexts.

use deepscore_core::{Config, Result, Texts};
use tracing::{debug, instrument, trace};

use crate::backend::Task;
use crate::device::Device;
use crate::math;
use crate::model::{Model, TextModel};

pub const METRIC: &str = "factual_consistency";
pub const DEFAULT_MODEL: &str = "cross-encoder/nli-deberta-v3-large";

/// Highest entailment probability of `prediction` given any of `contexts`.
///
/// The result is in `[0, 1]`; no contexts gives 0.
///
/// # Errors
///
/// Returns `BackendUnavailable` when the model cannot be acquired, or the
/// backend's error.
#[instrument(skip_all, fields(model = model.unwrap_or(DEFAULT_MODEL)))]
pub fn factual_consistency(
    contexts: impl Into<Texts>,
    prediction: &str,
    model: Option<&str>,
    config: &Config,
) -> Result<f64> {
    let contexts = contexts.into();
    let device = Device::resolve(config.device.as_deref())?;
    let def = config.model_for(METRIC, model, DEFAULT_MODEL);
    let mut loaded = Model::load(&def, config, device, Task::Classify)?;
    factual_consistency_with(&mut loaded, contexts.as_slice(), prediction)
}

/// [`factual_consistency`] on an already-loaded NLI cross-encoder.
///
/// # Errors
///
/// Returns an error if the model returns no logits, or the model's error.
pub fn factual_consistency_with<M: TextModel + ?Sized>(
    model: &mut M,
    contexts: &[String],
    prediction: &str,
) -> Result<f64> {
    let entail = model.labels().index_of(&["entailment"]).unwrap_or(1);

    let mut best = 0.0f64;
    for context in contexts {
        let probs = math::softmax(&model.pair_logits(context, prediction)?);
        let Some(&p) = probs.get(entail).or_else(|| probs.last()) else {
            return Err(eyre::eyre!("factual consistency model returned no logits"));
        };
        trace!(score = p, "context scored");
        best = best.max(p);
    }
    debug!(score = best, contexts = contexts.len(), "factual_consistency done");
    Ok(best)
}
