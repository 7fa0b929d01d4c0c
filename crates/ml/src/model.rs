//! `HuggingFace` model acquisition and the loaded-model handle.

use std::collections::HashMap;
use std::path::PathBuf;

use deepscore_core::{BackendKind, Config, ModelDef, Result, ScoreError};
use eyre::WrapErr;
use hf_hub::{Repo, RepoType};
use serde::Deserialize;
use tokenizers::{Tokenizer, TruncationParams};
use tracing::{debug, info, instrument, warn};

use crate::backend::{Encoded, MlBackend, Task};
use crate::device::Device;
use crate::math;

/// Longest input fed to a model; longer inputs are truncated.
pub const MAX_TOKENS: usize = 512;

const TOKENIZER_FILE: &str = "tokenizer.json";
const CONFIG_FILE: &str = "config.json";
const ONNX_FILE: &str = "onnx/model.onnx";
const SAFETENSORS_FILE: &str = "model.safetensors";

/// Backend actually used once `BackendKind::Auto` is resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Engine {
    Onnx,
    Candle,
}

impl Engine {
    /// Pick a compiled-in engine for the configured backend kind.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` when the requested engine is not compiled in.
    pub fn select(kind: BackendKind) -> Result<Self> {
        let onnx = cfg!(feature = "onnx");
        let candle = cfg!(feature = "candle");
        match kind {
            BackendKind::Auto if onnx => Ok(Self::Onnx),
            BackendKind::Auto if candle => Ok(Self::Candle),
            BackendKind::Onnx if onnx => Ok(Self::Onnx),
            BackendKind::Candle if candle => Ok(Self::Candle),
            BackendKind::Auto => Err(unavailable(
                "no model backend compiled in (enable the 'onnx' or 'candle' feature)".into(),
            )),
            other => Err(unavailable(format!(
                "{} backend not compiled in (enable the '{}' feature)",
                other.as_str(),
                other.as_str()
            ))),
        }
    }

    const fn weights_file(self) -> &'static str {
        match self {
            Self::Onnx => ONNX_FILE,
            Self::Candle => SAFETENSORS_FILE,
        }
    }
}

fn unavailable(msg: String) -> eyre::Report {
    warn!(%msg, "scoring backend unavailable");
    ScoreError::unavailable(msg)
}

/// Label names from a model's `config.json`, indexed by class id.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Labels(Vec<String>);

impl Labels {
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    #[must_use]
    pub fn names(&self) -> &[String] {
        &self.0
    }

    /// Index of the first label equal (case-insensitively) to any candidate.
    #[must_use]
    pub fn index_of(&self, candidates: &[&str]) -> Option<usize> {
        self.0
            .iter()
            .position(|name| candidates.iter().any(|c| name.eq_ignore_ascii_case(c)))
    }

    /// Index of the first label containing `needle` (case-insensitive).
    #[must_use]
    pub fn index_containing(&self, needle: &str) -> Option<usize> {
        let needle = needle.to_ascii_lowercase();
        self.0
            .iter()
            .position(|name| name.to_ascii_lowercase().contains(&needle))
    }

    /// Label name for `idx`, or `LABEL_{idx}` when the config has none.
    #[must_use]
    pub fn name(&self, idx: usize) -> String {
        self.0
            .get(idx)
            .cloned()
            .unwrap_or_else(|| format!("LABEL_{idx}"))
    }
}

#[derive(Debug, Deserialize)]
struct ModelConfigFile {
    id2label: Option<HashMap<String, String>>,
}

fn parse_labels(config_json: &str) -> Result<Labels> {
    let parsed: ModelConfigFile = serde_json::from_str(config_json)?;
    let Some(map) = parsed.id2label else {
        return Ok(Labels::default());
    };
    let mut pairs: Vec<(usize, String)> = map
        .into_iter()
        .filter_map(|(id, name)| id.parse::<usize>().ok().map(|id| (id, name)))
        .collect();
    pairs.sort_by_key(|(id, _)| *id);
    Ok(Labels(pairs.into_iter().map(|(_, name)| name).collect()))
}

/// Local paths of everything needed to build a model.
#[derive(Debug, Clone)]
pub struct ModelFiles {
    pub tokenizer: PathBuf,
    pub config: PathBuf,
    pub weights: PathBuf,
}

fn hf_repo_id(def: &ModelDef) -> Repo {
    match &def.revision {
        Some(rev) => Repo::with_revision(def.repo.clone(), RepoType::Model, rev.clone()),
        None => Repo::new(def.repo.clone(), RepoType::Model),
    }
}

/// Download (or locate in the hub cache) the files for `def`.
///
/// # Errors
///
/// Returns `BackendUnavailable` in offline mode when a file is not cached,
/// or the hub client's error when a download fails.
#[instrument(skip(config), fields(repo = %def.repo, offline = config.offline))]
pub fn fetch(def: &ModelDef, config: &Config, engine: Engine) -> Result<ModelFiles> {
    let files = [TOKENIZER_FILE, CONFIG_FILE, engine.weights_file()];

    let paths: Vec<PathBuf> = if config.offline {
        let cache = config
            .cache_dir
            .clone()
            .map_or_else(hf_hub::Cache::default, hf_hub::Cache::new);
        let repo = cache.repo(hf_repo_id(def));
        files
            .iter()
            .map(|file| {
                repo.get(file).ok_or_else(|| {
                    unavailable(format!("{file} for {} is not in the local cache", def.repo))
                })
            })
            .collect::<Result<_>>()?
    } else {
        let mut builder = hf_hub::api::sync::ApiBuilder::new();
        if let Some(token) = config.hf_token.clone() {
            debug!("using HuggingFace token from config");
            builder = builder.with_token(Some(token));
        }
        if let Some(dir) = config.cache_dir.clone() {
            builder = builder.with_cache_dir(dir);
        }
        let api = builder
            .build()
            .wrap_err("failed to build HuggingFace API client")?;
        let repo = api.repo(hf_repo_id(def));
        files
            .iter()
            .map(|file| {
                repo.get(file)
                    .wrap_err_with(|| format!("{file} download failed for {}", def.repo))
            })
            .collect::<Result<_>>()?
    };

    let [tokenizer, config_path, weights]: [PathBuf; 3] = paths
        .try_into()
        .map_err(|_| eyre::eyre!("expected three model files"))?;
    debug!(weights = %weights.display(), "model files ready");
    Ok(ModelFiles {
        tokenizer,
        config: config_path,
        weights,
    })
}

/// What the metrics need from a loaded model.
///
/// [`Model`] is the real implementation; the trait is the seam the metric
/// aggregation code is written against.
pub trait TextModel {
    fn labels(&self) -> &Labels;

    /// Logits for a single text.
    fn logits(&mut self, text: &str) -> Result<Vec<f32>>;

    /// Logits for a text pair (premise/hypothesis, query/candidate).
    fn pair_logits(&mut self, first: &str, second: &str) -> Result<Vec<f32>>;

    /// Contextual embeddings of the non-special tokens of `text`.
    fn token_embeddings(&mut self, text: &str) -> Result<Vec<Vec<f32>>>;

    /// Unit-length mean of the token embeddings of `text`.
    ///
    /// [`Model`] pools over every attended token, special tokens included.
    fn sentence_embedding(&mut self, text: &str) -> Result<Vec<f32>> {
        let mut pooled = math::mean_pool(&self.token_embeddings(text)?);
        math::l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

/// A tokenizer plus a backend, built for one call and dropped after it.
pub struct Model {
    repo: String,
    device: Device,
    tokenizer: Tokenizer,
    backend: Box<dyn MlBackend>,
    labels: Labels,
}

impl std::fmt::Debug for Model {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Model")
            .field("repo", &self.repo)
            .field("device", &self.device)
            .field("labels", &self.labels)
            .finish_non_exhaustive()
    }
}

impl Model {
    /// Acquire files for `def` and build the configured backend on `device`.
    ///
    /// # Errors
    ///
    /// Returns `BackendUnavailable` if no usable backend is compiled in or the
    /// files cannot be located offline; otherwise propagates download,
    /// tokenizer and backend errors.
    #[instrument(skip(config), fields(repo = %def.repo, %device, backend = config.backend.as_str()))]
    pub fn load(def: &ModelDef, config: &Config, device: Device, task: Task) -> Result<Self> {
        let engine = Engine::select(config.backend)?;
        debug!(?engine, ?task, "loading model");
        let files = fetch(def, config, engine)?;

        let mut tokenizer = Tokenizer::from_file(&files.tokenizer).map_err(|e| eyre::eyre!(e))?;
        tokenizer.with_padding(None);
        tokenizer
            .with_truncation(Some(TruncationParams {
                max_length: MAX_TOKENS,
                ..TruncationParams::default()
            }))
            .map_err(|e| eyre::eyre!(e))?;

        let config_json = std::fs::read_to_string(&files.config)
            .wrap_err_with(|| format!("failed to read {}", files.config.display()))?;
        let labels = parse_labels(&config_json)?;

        let backend = build_backend(engine, &files, &config_json, device, task)?;
        info!(labels = labels.names().len(), "model loaded");

        Ok(Self {
            repo: def.repo.clone(),
            device,
            tokenizer,
            backend,
            labels,
        })
    }

    #[must_use]
    pub fn repo(&self) -> &str {
        &self.repo
    }

    #[must_use]
    pub const fn device(&self) -> Device {
        self.device
    }

    fn run_logits(&mut self, encoding: &tokenizers::Encoding) -> Result<Vec<f32>> {
        self.backend.logits(&Encoded {
            ids: encoding.get_ids(),
            attention_mask: encoding.get_attention_mask(),
            type_ids: encoding.get_type_ids(),
        })
    }

    fn hidden_states(&mut self, text: &str) -> Result<(tokenizers::Encoding, Vec<Vec<f32>>)> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| eyre::eyre!(e))?;
        let rows = self.backend.hidden_states(&Encoded {
            ids: encoding.get_ids(),
            attention_mask: encoding.get_attention_mask(),
            type_ids: encoding.get_type_ids(),
        })?;
        Ok((encoding, rows))
    }
}

/// Rows whose mask entry is `keep`.
fn select_rows(rows: Vec<Vec<f32>>, mask: &[u32], keep: u32) -> Vec<Vec<f32>> {
    rows.into_iter()
        .zip(mask)
        .filter(|(_, m)| **m == keep)
        .map(|(row, _)| row)
        .collect()
}

impl TextModel for Model {
    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn logits(&mut self, text: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode(text, true)
            .map_err(|e| eyre::eyre!(e))?;
        self.run_logits(&encoding)
    }

    fn pair_logits(&mut self, first: &str, second: &str) -> Result<Vec<f32>> {
        let encoding = self
            .tokenizer
            .encode((first, second), true)
            .map_err(|e| eyre::eyre!(e))?;
        self.run_logits(&encoding)
    }

    fn token_embeddings(&mut self, text: &str) -> Result<Vec<Vec<f32>>> {
        let (encoding, rows) = self.hidden_states(text)?;
        Ok(select_rows(rows, encoding.get_special_tokens_mask(), 0))
    }

    fn sentence_embedding(&mut self, text: &str) -> Result<Vec<f32>> {
        let (encoding, rows) = self.hidden_states(text)?;
        let attended = select_rows(rows, encoding.get_attention_mask(), 1);
        let mut pooled = math::mean_pool(&attended);
        math::l2_normalize(&mut pooled);
        Ok(pooled)
    }
}

#[allow(unused_variables)]
fn build_backend(
    engine: Engine,
    files: &ModelFiles,
    config_json: &str,
    device: Device,
    task: Task,
) -> Result<Box<dyn MlBackend>> {
    match engine {
        #[cfg(feature = "onnx")]
        Engine::Onnx => Ok(Box::new(crate::onnx::OnnxBackend::load(
            &files.weights,
            device,
        )?)),
        #[cfg(feature = "candle")]
        Engine::Candle => Ok(Box::new(crate::candle::CandleBackend::load(
            &files.weights,
            config_json,
            device,
            task,
        )?)),
        #[allow(unreachable_patterns)]
        other => Err(unavailable(format!("{other:?} backend not compiled in"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn special_tokens_are_pooled_but_not_matched() {
        let rows = || vec![vec![1.0, 0.0], vec![0.0, 1.0], vec![1.0, 1.0]];
        let special = [1, 0, 1];
        let attention = [1, 1, 1];
        assert_eq!(select_rows(rows(), &special, 0), vec![vec![0.0, 1.0]]);
        assert_eq!(select_rows(rows(), &attention, 1).len(), 3);
        assert_eq!(
            math::mean_pool(&select_rows(rows(), &attention, 1)),
            vec![2.0 / 3.0, 2.0 / 3.0]
        );
    }

    #[test]
    fn labels_sorted_by_id() {
        let labels = parse_labels(
            r#"{"id2label": {"2": "neutral", "0": "contradiction", "1": "entailment"}}"#,
        )
        .unwrap();
        assert_eq!(labels.names(), ["contradiction", "entailment", "neutral"]);
        assert_eq!(labels.index_of(&["ENTAILMENT"]), Some(1));
        assert_eq!(labels.index_containing("contra"), Some(0));
    }

    #[test]
    fn missing_id2label_is_empty() {
        let labels = parse_labels(r#"{"hidden_size": 768}"#).unwrap();
        assert!(labels.names().is_empty());
        assert_eq!(labels.name(3), "LABEL_3");
    }

    #[test]
    fn offline_cache_miss_is_backend_unavailable() {
        let dir = tempfile::tempdir().unwrap();
        let config = Config {
            offline: true,
            cache_dir: Some(dir.path().to_path_buf()),
            ..Config::default()
        };
        let def = config.model_for("neural_bias", None, "org/not-cached");
        let err = fetch(&def, &config, Engine::Onnx).unwrap_err();
        assert!(matches!(
            ScoreError::of(&err),
            Some(ScoreError::BackendUnavailable(_))
        ));
    }

    #[test]
    fn engine_selection_follows_features() {
        let auto = Engine::select(BackendKind::Auto);
        if cfg!(feature = "onnx") {
            assert_eq!(auto.unwrap(), Engine::Onnx);
        } else if cfg!(feature = "candle") {
            assert_eq!(auto.unwrap(), Engine::Candle);
        } else {
            assert!(auto.is_err());
        }

        if !cfg!(feature = "candle") {
            let err = Engine::select(BackendKind::Candle).unwrap_err();
            assert!(matches!(
                ScoreError::of(&err),
                Some(ScoreError::BackendUnavailable(_))
            ));
        }
    }
}
