//! deepscore CLI - score generated text with lexical and model-based metrics.

mod cli;

use clap::Parser;
use deepscore::{Config, Metric, ScoreError, ScoreRequest};
use std::io::Read;
use std::process::ExitCode;
use tracing::{debug, info, warn};
use tracing_subscriber::{fmt, EnvFilter};

fn init_tracing() {
    let filter =
        EnvFilter::try_from_env("DEEPSCORE_LOG").unwrap_or_else(|_| EnvFilter::new("warn"));
    fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
}

fn main() -> ExitCode {
    init_tracing();

    let cli = cli::Cli::parse();
    let mut config = cli.config();
    if let Err(e) = config.load_overrides() {
        warn!(%e, "invalid model overrides");
        eprintln!("deepscore: {e:#}");
        return ExitCode::FAILURE;
    }

    match cli.command {
        cli::Command::List => run_list(),
        cli::Command::Score(args) => run_score(&config, &args),
    }
}

fn run_list() -> ExitCode {
    for metric in Metric::ALL {
        let kind = if metric.is_model_based() { "model" } else { "lexical" };
        println!("{metric}\t{kind}");
    }
    ExitCode::SUCCESS
}

fn read_request() -> eyre::Result<ScoreRequest> {
    let mut input = String::new();
    std::io::stdin().read_to_string(&mut input)?;
    let request = serde_json::from_str(input.trim())
        .map_err(|e| ScoreError::invalid(format!("invalid request JSON: {e}")))?;
    Ok(request)
}

fn run_score(config: &Config, args: &cli::ScoreArgs) -> ExitCode {
    let request = if args.stdin {
        debug!("reading request from stdin");
        match read_request() {
            Ok(request) => request,
            Err(e) => {
                warn!(%e, "failed to read request");
                eprintln!("deepscore: {e:#}");
                return ExitCode::FAILURE;
            }
        }
    } else {
        args.request()
    };

    info!(metric = %args.metric, "scoring");
    let result = match deepscore::score(&args.metric, &request, config) {
        Ok(result) => result,
        Err(e) => {
            match ScoreError::of(&e) {
                Some(kind) => warn!(%kind, "scoring failed"),
                None => warn!(error = %e, "scoring failed"),
            }
            eprintln!("deepscore: {e:#}");
            return ExitCode::FAILURE;
        }
    };

    match serde_json::to_string(&result) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(e) => {
            eprintln!("deepscore: failed to serialize result: {e}");
            ExitCode::FAILURE
        }
    }
}
