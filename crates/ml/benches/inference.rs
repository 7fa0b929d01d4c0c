//! Benchmark model-backed metrics on a preloaded model.
//!
//! Run with:
//!   cargo bench -p deepscore-ml --bench inference                                       # onnx
//!   cargo bench -p deepscore-ml --bench inference --no-default-features --features candle
//!
//! Set HF_TOKEN for gated model downloads. Model load time is excluded.

use std::time::Duration;

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use deepscore_core::Config;
use deepscore_ml::backend::Task;
use deepscore_ml::{bertscore, bias, Device, Model};

const SHORT: &str = "The quarterly earnings report shows revenue increased by 12% \
    year-over-year, driven primarily by strong performance in the cloud services division.";

const MEDIUM: &str = "The quarterly earnings report shows revenue increased by 12% \
    year-over-year, driven primarily by strong performance in the cloud services division. \
    Operating margins improved to 28.5%, up from 25.1% in the prior year period. The company \
    repurchased $2.3 billion in shares during the quarter and declared a quarterly dividend \
    of $0.68 per share. Management raised full-year guidance, now expecting revenue growth \
    of 10-12% and earnings per share of $8.50-$8.75.";

const REFERENCE: &str = "Revenue grew 12% over the year on the back of the cloud business, \
    and the company raised its full-year guidance.";

fn make_config() -> Config {
    Config {
        hf_token: std::env::var("HF_TOKEN").ok(),
        ..Config::default()
    }
}

fn load(metric: &str, default_repo: &str, task: Task) -> Option<Model> {
    let config = make_config();
    let def = config.model_for(metric, None, default_repo);
    let device = Device::resolve(None).ok()?;
    match Model::load(&def, &config, device, task) {
        Ok(model) => Some(model),
        Err(e) => {
            eprintln!("Skipping {metric} bench: {e}");
            None
        }
    }
}

fn bench_bias(c: &mut Criterion) {
    let Some(mut model) = load(bias::METRIC, bias::DEFAULT_MODEL, Task::Classify) else {
        return;
    };

    let mut group = c.benchmark_group("neural_bias");
    group.sample_size(20);
    group.warm_up_time(Duration::from_secs(3));

    for (name, text) in [("short", SHORT), ("medium", MEDIUM)] {
        group.bench_with_input(
            BenchmarkId::new("classify", format!("{name}/{} chars", text.len())),
            &text,
            |b, text| b.iter(|| bias::neural_bias_with(&mut model, text)),
        );
    }
    group.finish();
}

fn bench_bert_score(c: &mut Criterion) {
    let Some(mut model) = load(bertscore::METRIC, bertscore::DEFAULT_MODEL, Task::Embed) else {
        return;
    };
    let references = vec![REFERENCE.to_string()];

    let mut group = c.benchmark_group("bert_score");
    group.sample_size(10);
    group.warm_up_time(Duration::from_secs(5));
    group.measurement_time(Duration::from_secs(30));

    for (name, text) in [("short", SHORT), ("medium", MEDIUM)] {
        let predictions = vec![text.to_string()];
        group.bench_with_input(
            BenchmarkId::new("match", format!("{name}/{} chars", text.len())),
            &predictions,
            |b, predictions| {
                b.iter(|| bertscore::bert_score_with(&mut model, &references, predictions, None));
            },
        );
    }
    group.finish();
}

criterion_group!(benches, bench_bias, bench_bert_score);
criterion_main!(benches);
