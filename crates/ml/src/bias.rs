//! Neural bias detection.

use deepscore_core::{Config, Result};
use tracing::{debug, instrument};

use crate::backend::Task;
use crate::device::Device;
use crate::math;
use crate::model::{Model, TextModel};

pub const METRIC: &str = "neural_bias";
pub const DEFAULT_MODEL: &str = "d4data/bias-detection-model";

/// Probability in `[0, 1]` that `text` is biased.
///
/// # Errors
///
/// Returns `BackendUnavailable` when the model cannot be acquired, or the
/// backend's error.
#[instrument(skip_all, fields(model = model.unwrap_or(DEFAULT_MODEL)))]
pub fn neural_bias(text: &str, model: Option<&str>, config: &Config) -> Result<f64> {
    let device = Device::resolve(config.device.as_deref())?;
    let def = config.model_for(METRIC, model, DEFAULT_MODEL);
    let mut loaded = Model::load(&def, config, device, Task::Classify)?;
    neural_bias_with(&mut loaded, text)
}

/// [`neural_bias`] on an already-loaded classifier.
///
/// # Errors
///
/// Returns an error if the model returns no logits, or the model's error.
pub fn neural_bias_with<M: TextModel + ?Sized>(model: &mut M, text: &str) -> Result<f64> {
    let logits = model.logits(text)?;
    let score = match logits.as_slice() {
        [] => return Err(eyre::eyre!("bias model returned no logits")),
        [single] => math::sigmoid(*single),
        _ => {
            let idx = model
                .labels()
                .index_of(&["biased"])
                .unwrap_or(1)
                .min(logits.len() - 1);
            math::softmax(&logits)[idx]
        }
    };
    debug!(score, "neural_bias done");
    Ok(score)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeModel;

    #[test]
    fn picks_biased_label() {
        let mut model = FakeModel::classifier(&["Biased", "Non-biased"], |_| vec![3.0, 0.0]);
        assert!(neural_bias_with(&mut model, "text").unwrap() > 0.9);
    }

    #[test]
    fn non_biased_is_not_matched_by_substring() {
        let mut model = FakeModel::classifier(&["Non-biased", "Biased"], |_| vec![3.0, 0.0]);
        assert!(neural_bias_with(&mut model, "text").unwrap() < 0.1);
    }

    #[test]
    fn single_logit_is_sigmoid() {
        let mut model = FakeModel::classifier(&[], |_| vec![0.0]);
        assert!((neural_bias_with(&mut model, "text").unwrap() - 0.5).abs() < 1e-12);
    }
}
