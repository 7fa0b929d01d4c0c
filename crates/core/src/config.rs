//! Runtime configuration for deepscore.

use std::path::PathBuf;

use serde::Deserialize;
use tracing::debug;

/// Which inference engine runs the model-based metrics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BackendKind {
    /// Whatever backend is compiled in, preferring ONNX Runtime.
    #[default]
    Auto,
    Onnx,
    Candle,
}

impl BackendKind {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Onnx => "onnx",
            Self::Candle => "candle",
        }
    }
}

impl std::str::FromStr for BackendKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "onnx" => Ok(Self::Onnx),
            "candle" => Ok(Self::Candle),
            other => Err(format!("unknown backend '{other}' (expected auto, onnx or candle)")),
        }
    }
}

/// A model override for one metric.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ModelDef {
    /// Metric name this override applies to (e.g. `"faithfulness"`).
    pub metric: String,
    /// `HuggingFace` repo ID.
    pub repo: String,
    /// Optional git revision; defaults to `main`.
    pub revision: Option<String>,
}

/// TOML configuration for model overrides (`~/.config/deepscore/models.toml`).
#[derive(Debug, Deserialize)]
struct ModelsConfig {
    models: Vec<ModelDef>,
}

/// Runtime configuration shared by all metrics.
#[derive(Debug, Clone, Default)]
pub struct Config {
    pub hf_token: Option<String>,
    /// Device string (`cpu`, `cuda`, `cuda:N`, `auto`). `None` means auto.
    pub device: Option<String>,
    pub backend: BackendKind,
    /// Only use files already present in the local hub cache.
    pub offline: bool,
    pub cache_dir: Option<PathBuf>,
    /// Root of the BERTScore baselines, laid out as `<lang>/<repo>.tsv`.
    pub baseline_dir: Option<PathBuf>,
    pub models: Vec<ModelDef>,
}

impl Config {
    /// Resolve the repo to use for `metric`, honoring overrides.
    ///
    /// An explicit `requested` model (from the call site) wins over overrides,
    /// which win over `default_repo`.
    #[must_use]
    pub fn model_for(&self, metric: &str, requested: Option<&str>, default_repo: &str) -> ModelDef {
        if let Some(repo) = requested.filter(|r| !r.trim().is_empty()) {
            return ModelDef {
                metric: metric.to_string(),
                repo: repo.trim().to_string(),
                revision: None,
            };
        }
        if let Some(def) = self.models.iter().find(|m| m.metric == metric) {
            debug!(metric, repo = %def.repo, "using model override");
            return def.clone();
        }
        ModelDef {
            metric: metric.to_string(),
            repo: default_repo.to_string(),
            revision: None,
        }
    }

    /// Where BERTScore baselines are looked up: the configured directory, or
    /// `~/.config/deepscore/baselines`.
    #[must_use]
    pub fn baselines_dir(&self) -> Option<PathBuf> {
        self.baseline_dir
            .clone()
            .or_else(|| config_dir().map(|p| p.join("baselines")))
    }

    /// Load model overrides from the default `models.toml`, if it exists.
    ///
    /// # Errors
    ///
    /// Returns an error if the file exists but cannot be read, parsed, or has no models.
    pub fn load_overrides(&mut self) -> crate::Result<()> {
        let Some(path) = overrides_path() else {
            debug!("cannot resolve config directory, skipping model overrides");
            return Ok(());
        };
        if !path.exists() {
            return Ok(());
        }
        self.models = read_models(&path)?;
        Ok(())
    }
}

fn config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|p| p.join(".config").join("deepscore"))
}

fn overrides_path() -> Option<PathBuf> {
    config_dir().map(|p| p.join("models.toml"))
}

/// Parse a `models.toml` file.
///
/// # Errors
///
/// Returns an error if the file cannot be read or parsed, or is empty.
pub fn read_models(path: &std::path::Path) -> crate::Result<Vec<ModelDef>> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| eyre::eyre!("failed to read {}: {e}", path.display()))?;

    let config: ModelsConfig = toml::from_str(&content)
        .map_err(|e| eyre::eyre!("failed to parse {}: {e}", path.display()))?;

    if config.models.is_empty() {
        return Err(eyre::eyre!(
            "models.toml must contain at least one [[models]] entry"
        ));
    }

    debug!(count = config.models.len(), path = %path.display(), "model overrides loaded");
    Ok(config.models)
}
