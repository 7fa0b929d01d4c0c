//! BERTScore: greedy token matching over contextual embeddings.
//!
//! Embeddings come from the model's last hidden layer. Raw values are cosine
//! similarities in `[-1, 1]`. By default they are rescaled with the baseline
//! for the model and language, found under [`Config::baselines_dir`] as
//! `<lang>/<repo>.tsv`; rescaled values are usually in `[0, 1]` but can go
//! below zero.

use std::io::Read;
use std::path::{Path, PathBuf};

use deepscore_core::{Config, Result, ScoreError, Texts};
use eyre::WrapErr;
use serde::Deserialize;
use tracing::{debug, instrument, trace, warn};

use crate::backend::Task;
use crate::device::Device;
use crate::math;
use crate::model::{Model, TextModel};

pub const METRIC: &str = "bert_score";
pub const DEFAULT_MODEL: &str = "microsoft/deberta-large-mnli";
pub const DEFAULT_LANG: &str = "en";

#[derive(Debug, Clone)]
pub struct BertScoreOptions {
    pub model: Option<String>,
    /// Language of the texts; selects the baseline file.
    pub lang: String,
    pub device: Option<String>,
    /// Rescale with the `(model, lang)` baseline when one is installed.
    pub rescale: bool,
    /// Explicit baseline, used instead of the installed one.
    pub baseline: Option<Baseline>,
}

impl Default for BertScoreOptions {
    fn default() -> Self {
        Self {
            model: None,
            lang: DEFAULT_LANG.to_string(),
            device: None,
            rescale: true,
            baseline: None,
        }
    }
}

/// Per-example precision, recall and F1, aligned with the predictions.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct BertScore {
    pub precision: Vec<f64>,
    pub recall: Vec<f64>,
    pub f1: Vec<f64>,
}

/// Expected scores of unrelated text pairs, used to spread the raw range.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub precision: f64,
    pub recall: f64,
    pub f1: f64,
}

#[derive(Debug, Deserialize)]
struct BaselineRow {
    #[serde(rename = "LAYER")]
    layer: u32,
    #[serde(rename = "P")]
    precision: f64,
    #[serde(rename = "R")]
    recall: f64,
    #[serde(rename = "F")]
    f1: f64,
}

impl Baseline {
    /// Path of the baseline for `repo` in `lang` under `dir`.
    #[must_use]
    pub fn locate(dir: &Path, lang: &str, repo: &str) -> PathBuf {
        dir.join(lang).join(format!("{repo}.tsv"))
    }

    /// Read a baseline file (`LAYER,P,R,F` CSV with a header row) and take
    /// the deepest layer.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a row is malformed, or
    /// there are no rows.
    pub fn from_file(path: &Path) -> Result<Self> {
        let file = std::fs::File::open(path)
            .wrap_err_with(|| format!("failed to read baseline {}", path.display()))?;
        Self::from_reader(file).wrap_err_with(|| format!("invalid baseline {}", path.display()))
    }

    fn from_reader<R: Read>(source: R) -> Result<Self> {
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .trim(csv::Trim::All)
            .from_reader(source);

        let mut deepest: Option<BaselineRow> = None;
        for row in reader.deserialize() {
            let row: BaselineRow = row?;
            if deepest.as_ref().map_or(true, |d| row.layer > d.layer) {
                deepest = Some(row);
            }
        }
        let row = deepest.ok_or_else(|| eyre::eyre!("no LAYER,P,R,F rows"))?;
        debug!(layer = row.layer, "baseline layer selected");
        Ok(Self {
            precision: row.precision,
            recall: row.recall,
            f1: row.f1,
        })
    }

    fn rescale(value: f64, base: f64) -> f64 {
        (value - base) / (1.0 - base)
    }
}

/// The baseline `bert_score` rescales with, if any.
///
/// An explicit baseline wins. Otherwise, with rescaling on, the file for
/// `(lang, repo)` under `dir` is used when it exists; a missing file means
/// raw similarities.
fn resolve_baseline(
    opts: &BertScoreOptions,
    repo: &str,
    dir: Option<&Path>,
) -> Result<Option<Baseline>> {
    if let Some(baseline) = opts.baseline {
        return Ok(Some(baseline));
    }
    if !opts.rescale {
        return Ok(None);
    }
    let Some(dir) = dir else {
        warn!("no baseline directory, reporting raw similarities");
        return Ok(None);
    };
    let path = Baseline::locate(dir, &opts.lang, repo);
    if !path.exists() {
        warn!(
            path = %path.display(),
            lang = %opts.lang,
            repo,
            "no baseline installed, reporting raw similarities"
        );
        return Ok(None);
    }
    Baseline::from_file(&path).map(Some)
}

/// Which reference indices each prediction is compared with.
fn pairing(references: usize, predictions: usize) -> Result<Vec<Vec<usize>>> {
    if references == 0 || predictions == 0 {
        return Err(ScoreError::invalid(
            "bert_score needs at least one reference and one prediction",
        ));
    }
    if references == predictions {
        Ok((0..predictions).map(|i| vec![i]).collect())
    } else if predictions == 1 {
        Ok(vec![(0..references).collect()])
    } else if references == 1 {
        Ok(vec![vec![0]; predictions])
    } else {
        Err(ScoreError::invalid(format!(
            "bert_score got {predictions} predictions and {references} references; \
             lengths must match or one side must have a single element"
        )))
    }
}

/// BERTScore of each prediction against its reference(s).
///
/// Equal lengths compare pairwise. A single prediction is scored against
/// every reference and keeps the best of each measure. A single reference is
/// reused for every prediction.
///
/// # Errors
///
/// Returns `InvalidArgument` for incompatible lengths or a bad device string,
/// `BackendUnavailable` if no backend can be built, an error for an
/// unreadable baseline file, or the backend's error.
#[instrument(skip_all, fields(model = opts.model.as_deref().unwrap_or(DEFAULT_MODEL), lang = %opts.lang))]
pub fn bert_score(
    references: impl Into<Texts>,
    predictions: impl Into<Texts>,
    opts: &BertScoreOptions,
    config: &Config,
) -> Result<BertScore> {
    let references = references.into();
    let predictions = predictions.into();
    pairing(references.len(), predictions.len())?;

    let device = Device::resolve(opts.device.as_deref().or(config.device.as_deref()))?;
    let def = config.model_for(METRIC, opts.model.as_deref(), DEFAULT_MODEL);
    let baseline = resolve_baseline(opts, &def.repo, config.baselines_dir().as_deref())?;
    let mut model = Model::load(&def, config, device, Task::Embed)?;
    bert_score_with(
        &mut model,
        references.as_slice(),
        predictions.as_slice(),
        baseline,
    )
}

/// [`bert_score`] on an already-loaded model.
///
/// # Errors
///
/// Returns `InvalidArgument` for incompatible lengths, or the model's error.
pub fn bert_score_with<M: TextModel + ?Sized>(
    model: &mut M,
    references: &[String],
    predictions: &[String],
    baseline: Option<Baseline>,
) -> Result<BertScore> {
    let plan = pairing(references.len(), predictions.len())?;

    let ref_embeddings = references
        .iter()
        .map(|r| normalized_tokens(model, r))
        .collect::<Result<Vec<_>>>()?;

    let mut out = BertScore::default();
    for (prediction, ref_ids) in predictions.iter().zip(&plan) {
        let cand = normalized_tokens(model, prediction)?;
        let (mut p, mut r, mut f) = (f64::NEG_INFINITY, f64::NEG_INFINITY, f64::NEG_INFINITY);
        for &ri in ref_ids {
            let (pi, rr, fi) = greedy_match(&cand, &ref_embeddings[ri]);
            p = p.max(pi);
            r = r.max(rr);
            f = f.max(fi);
        }
        if let Some(b) = baseline {
            p = Baseline::rescale(p, b.precision);
            r = Baseline::rescale(r, b.recall);
            f = Baseline::rescale(f, b.f1);
        }
        trace!(precision = p, recall = r, f1 = f, "bert_score example");
        out.precision.push(p);
        out.recall.push(r);
        out.f1.push(f);
    }
    debug!(examples = out.f1.len(), "bert_score done");
    Ok(out)
}

fn normalized_tokens<M: TextModel + ?Sized>(model: &mut M, text: &str) -> Result<Vec<Vec<f32>>> {
    let mut rows = model.token_embeddings(text)?;
    for row in &mut rows {
        math::l2_normalize(row);
    }
    Ok(rows)
}

/// Precision, recall and F1 of greedy cosine matching between unit vectors.
fn greedy_match(candidate: &[Vec<f32>], reference: &[Vec<f32>]) -> (f64, f64, f64) {
    if candidate.is_empty() || reference.is_empty() {
        return (0.0, 0.0, 0.0);
    }
    let sim: Vec<Vec<f64>> = candidate
        .iter()
        .map(|c| reference.iter().map(|r| math::dot(c, r)).collect())
        .collect();

    let precision = sim
        .iter()
        .map(|row| row.iter().copied().fold(f64::NEG_INFINITY, f64::max))
        .sum::<f64>()
        / candidate.len() as f64;
    let recall = (0..reference.len())
        .map(|j| sim.iter().map(|row| row[j]).fold(f64::NEG_INFINITY, f64::max))
        .sum::<f64>()
        / reference.len() as f64;
    let f1 = if precision + recall == 0.0 {
        0.0
    } else {
        2.0 * precision * recall / (precision + recall)
    };
    (precision, recall, f1)
}
