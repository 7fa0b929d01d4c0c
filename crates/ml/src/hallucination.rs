//! Source-vs-summary hallucination classifier.

use deepscore_core::{Config, Result};
use tracing::{debug, instrument};

use crate::backend::Task;
use crate::device::Device;
use crate::math;
use crate::model::{Model, TextModel};

pub const METRIC: &str = "hallucination";
pub const DEFAULT_MODEL: &str = "vectara/hallucination_evaluation_model";

/// Probability in `[0, 1]` that `prediction` is consistent with `source`.
/// Lower values mean more hallucination.
///
/// # Errors
///
/// Returns `BackendUnavailable` when the model cannot be acquired, or the
/// backend's error.
#[instrument(skip_all, fields(model = model.unwrap_or(DEFAULT_MODEL)))]
pub fn hallucination(
    source: &str,
    prediction: &str,
    model: Option<&str>,
    config: &Config,
) -> Result<f64> {
    let device = Device::resolve(config.device.as_deref())?;
    let def = config.model_for(METRIC, model, DEFAULT_MODEL);
    let mut loaded = Model::load(&def, config, device, Task::Classify)?;
    hallucination_with(&mut loaded, source, prediction)
}

/// [`hallucination`] on an already-loaded classifier.
///
/// # Errors
///
/// Returns an error if the model returns no logits, or the model's error.
pub fn hallucination_with<M: TextModel + ?Sized>(
    model: &mut M,
    source: &str,
    prediction: &str,
) -> Result<f64> {
    let logits = model.pair_logits(source, prediction)?;
    let score = match logits.as_slice() {
        [] => return Err(eyre::eyre!("hallucination model returned no logits")),
        [single] => math::sigmoid(*single),
        _ => {
            let idx = model
                .labels()
                .index_of(&["consistent"])
                .unwrap_or(1)
                .min(logits.len() - 1);
            math::softmax(&logits)[idx]
        }
    };
    debug!(score, "hallucination done");
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeModel;

    #[test]
    fn single_logit_is_sigmoid() {
        let mut model = FakeModel::cross(&[], |_, _| vec![0.0]);
        let score = hallucination_with(&mut model, "src", "sum").unwrap();
        assert!((score - 0.5).abs() < 1e-12);
    }

    #[test]
    fn uses_consistent_label() {
        let mut model = FakeModel::cross(&["consistent", "hallucinated"], |_, _| vec![5.0, 0.0]);
        let score = hallucination_with(&mut model, "src", "sum").unwrap();
        assert!(score > 0.99);
    }

    #[test]
    fn falls_back_to_second_class() {
        let mut model = FakeModel::cross(&[], |_, _| vec![0.0, 5.0]);
        let score = hallucination_with(&mut model, "src", "sum").unwrap();
        assert!(score > 0.99);
    }

    #[test]
    fn empty_logits_are_an_error() {
        let mut model = FakeModel::cross(&[], |_, _| Vec::new());
        assert!(hallucination_with(&mut model, "src", "sum").is_err());
    }
}
