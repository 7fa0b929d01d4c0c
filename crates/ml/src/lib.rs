//! Model-based scoring metrics.
//!
//! Every metric has two entry points: a plain function that resolves the
//! device, acquires a fresh [`Model`] and drops it when done, and a `*_with`
//! variant that runs on a model the caller already holds (for example one
//! kept in a [`ModelCache`]).

pub mod backend;
pub mod bertscore;
pub mod bias;
pub mod cache;
pub mod device;
pub mod factual;
pub mod faithfulness;
pub mod hallucination;
pub mod math;
pub mod model;
pub mod relevancy;
pub mod segment;
pub mod toxicity;

#[cfg(feature = "candle")]
pub mod candle;
#[cfg(feature = "onnx")]
pub mod onnx;

#[cfg(test)]
pub(crate) mod testing;

pub use bertscore::{bert_score, bert_score_with, Baseline, BertScore, BertScoreOptions};
pub use bias::{neural_bias, neural_bias_with};
pub use cache::{CacheKey, ModelCache};
pub use device::Device;
pub use factual::{factual_consistency, factual_consistency_with};
pub use faithfulness::{faithfulness, faithfulness_with, FaithfulnessOptions};
pub use hallucination::{hallucination, hallucination_with};
pub use model::{Labels, Model, TextModel};
pub use relevancy::{answer_relevancy, answer_relevancy_with, ModelType, Relevancy, RelevancyOptions};
pub use segment::Granularity;
pub use toxicity::{neural_toxicity, neural_toxicity_with};
