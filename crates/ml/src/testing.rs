//! Deterministic stand-in for a loaded model.

use deepscore_core::Result;

use crate::model::{Labels, TextModel};

/// Scripted model: logits come from plain functions, token embeddings are
/// byte histograms of whitespace-separated words.
pub(crate) struct FakeModel {
    labels: Labels,
    single: fn(&str) -> Vec<f32>,
    pair: fn(&str, &str) -> Vec<f32>,
    calls: usize,
}

impl Default for FakeModel {
    fn default() -> Self {
        Self {
            labels: Labels::default(),
            single: |_| vec![0.0],
            pair: |_, _| vec![0.0],
            calls: 0,
        }
    }
}

impl FakeModel {
    pub(crate) fn classifier(labels: &[&str], single: fn(&str) -> Vec<f32>) -> Self {
        Self {
            labels: Labels::new(labels.iter().map(|l| (*l).to_string()).collect()),
            single,
            ..Self::default()
        }
    }

    pub(crate) fn cross(labels: &[&str], pair: fn(&str, &str) -> Vec<f32>) -> Self {
        Self {
            labels: Labels::new(labels.iter().map(|l| (*l).to_string()).collect()),
            pair,
            ..Self::default()
        }
    }

    pub(crate) const fn calls(&self) -> usize {
        self.calls
    }
}

fn word_vector(word: &str) -> Vec<f32> {
    let mut v = vec![0.0f32; 256];
    for b in word.bytes() {
        v[usize::from(b)] += 1.0;
    }
    v
}

impl TextModel for FakeModel {
    fn labels(&self) -> &Labels {
        &self.labels
    }

    fn logits(&mut self, text: &str) -> Result<Vec<f32>> {
        self.calls += 1;
        Ok((self.single)(text))
    }

    fn pair_logits(&mut self, first: &str, second: &str) -> Result<Vec<f32>> {
        self.calls += 1;
        Ok((self.pair)(first, second))
    }

    fn token_embeddings(&mut self, text: &str) -> Result<Vec<Vec<f32>>> {
        self.calls += 1;
        Ok(text.split_whitespace().map(word_vector).collect())
    }
}
