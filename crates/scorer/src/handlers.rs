//! Built-in metric handlers: validate, promote shapes, delegate, shape the result.

use std::collections::BTreeMap;

use deepscore_core::bleu::bleu_with;
use deepscore_core::{
    exact_match, quasi_exact_match, rouge, BleuOrder, Config, Result, ScoreError, ScoreResult,
};
use deepscore_ml::{
    answer_relevancy, bertscore, bert_score, factual_consistency, faithfulness, hallucination, neural_bias,
    neural_toxicity, Baseline, BertScoreOptions, FaithfulnessOptions, Granularity, ModelType,
    Relevancy, RelevancyOptions,
};

use crate::metric::Metric;
use crate::registry::Handler;
use crate::request::ScoreRequest;

pub(crate) fn handler(metric: Metric) -> Handler {
    match metric {
        Metric::Rouge => rouge_handler,
        Metric::Bleu => bleu_handler,
        Metric::ExactMatch => exact_match_handler,
        Metric::QuasiExactMatch => quasi_exact_match_handler,
        Metric::BertScore => bert_score_handler,
        Metric::Faithfulness => faithfulness_handler,
        Metric::Hallucination => hallucination_handler,
        Metric::AnswerRelevancy => answer_relevancy_handler,
        Metric::FactualConsistency => factual_consistency_handler,
        Metric::NeuralToxicity => neural_toxicity_handler,
        Metric::NeuralBias => neural_bias_handler,
        Metric::Pii => pii_score,
    }
}

fn rouge_handler(req: &ScoreRequest, _config: &Config) -> Result<ScoreResult> {
    let variant = req
        .variant()
        .ok_or_else(|| ScoreError::invalid("rouge needs a variant: rouge1, rouge2 or rougeL"))?;
    let score = rouge(req.target_str()?, req.prediction_str()?, variant)?;
    Ok(score.into())
}

fn bleu_handler(req: &ScoreRequest, _config: &Config) -> Result<ScoreResult> {
    let order = req
        .variant()
        .map(str::parse::<BleuOrder>)
        .transpose()?
        .unwrap_or_default();
    let score = bleu_with(req.target_texts()?.clone(), req.prediction_str()?, order);
    Ok(score.into())
}

fn exact_match_handler(req: &ScoreRequest, _config: &Config) -> Result<ScoreResult> {
    Ok(exact_match(req.target_str()?, req.prediction_str()?).into())
}

fn quasi_exact_match_handler(req: &ScoreRequest, _config: &Config) -> Result<ScoreResult> {
    Ok(quasi_exact_match(req.target_str()?, req.prediction_str()?).into())
}

fn bert_score_handler(req: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    let references = req.target_texts()?.clone();
    let predictions = req.prediction_texts()?.clone();
    let baseline = req
        .baseline
        .as_deref()
        .map(Baseline::from_file)
        .transpose()?;
    let opts = BertScoreOptions {
        model: req.model.clone(),
        lang: req
            .lang
            .clone()
            .unwrap_or_else(|| bertscore::DEFAULT_LANG.to_string()),
        device: req.device.clone(),
        rescale: !req.raw,
        baseline,
    };
    let score = bert_score(references, predictions, &opts, config)?;

    let mut out = BTreeMap::new();
    out.insert("bert-precision".to_string(), score.precision);
    out.insert("bert-recall".to_string(), score.recall);
    out.insert("bert-f1".to_string(), score.f1);
    Ok(ScoreResult::Batched(out))
}

fn faithfulness_handler(req: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    let granularity = req
        .variant()
        .map(str::parse::<Granularity>)
        .transpose()?
        .unwrap_or_default();
    let target = req.target_str()?;
    let prediction = req.prediction_str()?;
    let opts = FaithfulnessOptions {
        model: req.model.clone(),
        granularity,
        device: req.device.clone(),
    };
    Ok(faithfulness(target, prediction, &opts, config)?.into())
}

fn hallucination_handler(req: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    let source = req.target_str()?;
    let prediction = req.prediction_str()?;
    let config = req.config(config);
    Ok(hallucination(source, prediction, req.model(), &config)?.into())
}

fn answer_relevancy_handler(req: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    let model_type = req
        .variant()
        .map(str::parse::<ModelType>)
        .transpose()?
        .unwrap_or_default();
    let predictions = req.prediction_texts()?.clone();
    let target = req.target_str()?;
    let opts = RelevancyOptions {
        model_type,
        model: req.model.clone(),
        device: req.device.clone(),
        first_only: req.first_only,
    };
    Ok(match answer_relevancy(predictions, target, &opts, config)? {
        Relevancy::Score(score) => ScoreResult::Scalar(score),
        Relevancy::Scores(scores) => ScoreResult::Vector(scores),
    })
}

fn factual_consistency_handler(req: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    let contexts = req.target_texts()?.clone();
    let prediction = req.prediction_str()?;
    let config = req.config(config);
    Ok(factual_consistency(contexts, prediction, req.model(), &config)?.into())
}

fn neural_toxicity_handler(req: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    let prediction = req.prediction_str()?;
    let variant = req.variant().or_else(|| req.model());
    let config = req.config(config);
    Ok(ScoreResult::Breakdown(neural_toxicity(
        prediction, variant, &config,
    )?))
}

fn neural_bias_handler(req: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    let text = req.prediction_str()?;
    let config = req.config(config);
    Ok(neural_bias(text, req.model(), &config)?.into())
}

/// Placeholder for PII detection. Always fails with `NotSupported`.
///
/// # Errors
///
/// Always.
pub fn pii_score(_req: &ScoreRequest, _config: &Config) -> Result<ScoreResult> {
    Err(ScoreError::unsupported("pii scoring is not implemented"))
}
