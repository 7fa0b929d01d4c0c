//! Candle backend - pure Rust, no native dependencies.
//!
//! Covers BERT encoders (embeddings) and `DeBERTa` v2/v3 (embeddings and
//! sequence classification). Other architectures need the ONNX backend.

use std::path::Path;

use candle_core::Tensor;
use candle_nn::VarBuilder;
use candle_transformers::models::bert::{BertModel, Config as BertConfig, DTYPE as BERT_DTYPE};
use candle_transformers::models::debertav2::{
    Config as DebertaV2Config, DebertaV2Model, DebertaV2SeqClassificationModel, DTYPE,
};
use deepscore_core::{Result, ScoreError};
use serde::Deserialize;
use tracing::debug;

use crate::backend::{Encoded, MlBackend, Task};
use crate::device::Device;

enum Net {
    Bert(BertModel),
    DebertaEncoder(DebertaV2Model),
    DebertaClassifier(DebertaV2SeqClassificationModel),
}

#[derive(Deserialize)]
struct ModelType {
    model_type: Option<String>,
}

pub struct CandleBackend {
    net: Net,
    device: candle_core::Device,
}

impl CandleBackend {
    /// # Errors
    ///
    /// Returns `BackendUnavailable` for architectures this backend cannot run,
    /// or an error if the safetensors weights or config cannot be loaded.
    ///
    /// # Safety
    ///
    /// Uses memory-mapped safetensors via `VarBuilder::from_mmaped_safetensors`.
    pub fn load(weights: &Path, config_json: &str, device: Device, task: Task) -> Result<Self> {
        let device = match device {
            Device::Cpu => candle_core::Device::Cpu,
            Device::Cuda(ordinal) => candle_core::Device::new_cuda(ordinal)?,
        };
        let model_type = serde_json::from_str::<ModelType>(config_json)?
            .model_type
            .unwrap_or_default();
        debug!(%model_type, ?task, "building candle model");

        let net = match (model_type.as_str(), task) {
            ("bert", Task::Embed) => {
                let config: BertConfig = serde_json::from_str(config_json)?;
                let vb =
                    unsafe { VarBuilder::from_mmaped_safetensors(&[weights], BERT_DTYPE, &device)? };
                Net::Bert(BertModel::load(vb, &config)?)
            }
            ("deberta-v2", task) => {
                let config: DebertaV2Config = serde_json::from_str(config_json)?;
                let vb = unsafe { VarBuilder::from_mmaped_safetensors(&[weights], DTYPE, &device)? };
                let vb = vb.set_prefix("deberta");
                match task {
                    Task::Embed => Net::DebertaEncoder(DebertaV2Model::load(vb, &config)?),
                    Task::Classify => {
                        let id2label = config.id2label.clone();
                        Net::DebertaClassifier(DebertaV2SeqClassificationModel::load(
                            vb, &config, id2label,
                        )?)
                    }
                }
            }
            (other, task) => {
                return Err(ScoreError::unavailable(format!(
                    "candle backend cannot run '{other}' models for {task:?}; use the onnx backend"
                )))
            }
        };

        Ok(Self { net, device })
    }

    fn tensors(&self, input: &Encoded<'_>) -> Result<(Tensor, Tensor, Tensor)> {
        let ids = Tensor::new(input.ids, &self.device)?.unsqueeze(0)?;
        let mask = Tensor::new(input.attention_mask, &self.device)?.unsqueeze(0)?;
        let type_ids = Tensor::new(input.type_ids, &self.device)?.unsqueeze(0)?;
        Ok((ids, mask, type_ids))
    }
}

impl MlBackend for CandleBackend {
    fn logits(&mut self, input: &Encoded<'_>) -> Result<Vec<f32>> {
        let (ids, mask, type_ids) = self.tensors(input)?;
        let Net::DebertaClassifier(model) = &self.net else {
            return Err(ScoreError::unavailable(
                "this candle model was not loaded as a classifier",
            ));
        };
        let logits = model.forward(&ids, Some(type_ids), Some(mask))?;
        Ok(logits.squeeze(0)?.to_vec1()?)
    }

    fn hidden_states(&mut self, input: &Encoded<'_>) -> Result<Vec<Vec<f32>>> {
        let (ids, mask, type_ids) = self.tensors(input)?;
        let hidden = match &self.net {
            Net::Bert(model) => model.forward(&ids, &type_ids, Some(&mask))?,
            Net::DebertaEncoder(model) => model.forward(&ids, Some(type_ids), Some(mask))?,
            Net::DebertaClassifier(_) => {
                return Err(ScoreError::unavailable(
                    "this candle model was loaded as a classifier, not an encoder",
                ))
            }
        };
        Ok(hidden.squeeze(0)?.to_vec2()?)
    }
}
