//! CLI argument parsing.

use clap::{Parser, Subcommand};
use deepscore::{BackendKind, Config, ScoreRequest, Texts};
use std::path::PathBuf;

#[derive(Parser)]
#[command(name = "deepscore", about = "Score generated text against references")]
pub struct Cli {
    /// `HuggingFace` token (direct value)
    #[arg(long, env = "HF_TOKEN", hide_env_values = true)]
    pub hf_token: Option<String>,

    /// Path to `HuggingFace` token file
    #[arg(long, env = "HF_TOKEN_PATH")]
    pub hf_token_path: Option<PathBuf>,

    /// Compute device: auto, cpu, cuda or cuda:N
    #[arg(long, env = "DEEPSCORE_DEVICE")]
    pub device: Option<String>,

    /// Inference backend: auto, onnx or candle
    #[arg(long, env = "DEEPSCORE_BACKEND", default_value = "auto")]
    pub backend: BackendKind,

    /// Only use models already in the local cache
    #[arg(long, env = "DEEPSCORE_OFFLINE")]
    pub offline: bool,

    /// Model cache directory (defaults to the `HuggingFace` hub cache)
    #[arg(long, env = "DEEPSCORE_CACHE_DIR")]
    pub cache_dir: Option<PathBuf>,

    /// BERTScore baselines, as `<lang>/<repo>.tsv` (defaults to ~/.config/deepscore/baselines)
    #[arg(long, env = "DEEPSCORE_BASELINE_DIR")]
    pub baseline_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    /// Resolve the HF token from `--hf-token` or `--hf-token-path`.
    #[must_use]
    pub fn resolve_hf_token(&self) -> Option<String> {
        if let Some(ref token) = self.hf_token {
            let trimmed = token.trim();
            if !trimmed.is_empty() {
                return Some(trimmed.to_string());
            }
        }

        self.hf_token_path
            .as_deref()
            .and_then(read_token_file)
    }

    #[must_use]
    pub fn config(&self) -> Config {
        Config {
            hf_token: self.resolve_hf_token(),
            device: self.device.clone(),
            backend: self.backend,
            offline: self.offline,
            cache_dir: self.cache_dir.clone(),
            baseline_dir: self.baseline_dir.clone(),
            models: Vec::new(),
        }
    }
}

fn read_token_file(path: &std::path::Path) -> Option<String> {
    std::fs::read_to_string(path)
        .ok()
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
}

#[derive(Subcommand)]
pub enum Command {
    /// Score one example and print the result as JSON
    Score(ScoreArgs),
    /// List the available metrics
    List,
}

#[derive(clap::Args)]
pub struct ScoreArgs {
    /// Metric name (see `deepscore list`)
    pub metric: String,

    /// Reference / source text; repeat for several
    #[arg(long, short = 't')]
    pub target: Vec<String>,

    /// Generated text; repeat for several
    #[arg(long, short = 'p')]
    pub prediction: Vec<String>,

    /// Metric variant (rouge1, bleu2, self_encoder, paragraph, unbiased, ...)
    #[arg(long)]
    pub variant: Option<String>,

    /// Model repo id or alias
    #[arg(long, short = 'm')]
    pub model: Option<String>,

    /// Language code; selects the BERTScore baseline
    #[arg(long)]
    pub lang: Option<String>,

    /// Report only the first prediction's relevancy score
    #[arg(long)]
    pub first_only: bool,

    /// BERTScore baseline file (`LAYER,P,R,F` rows), instead of the installed one
    #[arg(long)]
    pub baseline: Option<PathBuf>,

    /// Report raw BERTScore similarities without baseline rescaling
    #[arg(long, conflicts_with = "baseline")]
    pub raw: bool,

    /// Read a JSON request from stdin instead of flags
    #[arg(long, conflicts_with_all = ["target", "prediction", "variant", "model", "lang", "first_only", "baseline", "raw"])]
    pub stdin: bool,
}

/// Zero values: absent; one: a lone string; more: a sequence.
fn texts(values: &[String]) -> Option<Texts> {
    match values {
        [] => None,
        [one] => Some(Texts::Single(one.clone())),
        many => Some(Texts::Many(many.to_vec())),
    }
}

impl ScoreArgs {
    #[must_use]
    pub fn request(&self) -> ScoreRequest {
        ScoreRequest {
            target: texts(&self.target),
            prediction: texts(&self.prediction),
            variant: self.variant.clone(),
            model: self.model.clone(),
            device: None,
            lang: self.lang.clone(),
            first_only: self.first_only,
            baseline: self.baseline.clone(),
            raw: self.raw,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Cli {
        Cli::try_parse_from(std::iter::once("deepscore").chain(args.iter().copied())).unwrap()
    }

    #[test]
    fn repeated_flags_become_sequences() {
        let cli = parse(&["score", "bleu", "-t", "ref one", "-t", "ref two", "-p", "hyp"]);
        let Command::Score(args) = cli.command else {
            panic!("expected score");
        };
        let req = args.request();
        assert_eq!(req.target, Some(Texts::Many(vec!["ref one".into(), "ref two".into()])));
        assert_eq!(req.prediction, Some(Texts::Single("hyp".into())));
    }

    #[test]
    fn stdin_conflicts_with_text_flags() {
        let res = Cli::try_parse_from(["deepscore", "score", "rouge", "--stdin", "-t", "x"]);
        assert!(res.is_err());
    }

    #[test]
    fn backend_flag_parses() {
        let cli = parse(&["--backend", "candle", "--offline", "list"]);
        let config = cli.config();
        assert_eq!(config.backend, BackendKind::Candle);
        assert!(config.offline);
        assert!(Cli::try_parse_from(["deepscore", "--backend", "tensorrt", "list"]).is_err());
    }

    #[test]
    fn baseline_flags_reach_config_and_request() {
        let cli = parse(&[
            "--baseline-dir",
            "/srv/baselines",
            "score",
            "bert_score",
            "-t",
            "a",
            "-p",
            "b",
            "--lang",
            "zh",
            "--raw",
        ]);
        assert_eq!(
            cli.config().baseline_dir,
            Some(PathBuf::from("/srv/baselines"))
        );
        let Command::Score(args) = cli.command else {
            panic!("expected score");
        };
        let req = args.request();
        assert_eq!(req.lang.as_deref(), Some("zh"));
        assert!(req.raw);
    }

    #[test]
    fn token_file_is_trimmed() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("token");
        std::fs::write(&path, "  hf_abc\n").unwrap();
        assert_eq!(read_token_file(&path).as_deref(), Some("hf_abc"));
        std::fs::write(&path, "\n").unwrap();
        assert_eq!(read_token_file(&path), None);
    }
}
