use deepscore_core::Result;

/// One tokenized input (a single text or a text pair), batch size 1.
#[derive(Debug, Clone, Copy)]
pub struct Encoded<'a> {
    pub ids: &'a [u32],
    pub attention_mask: &'a [u32],
    pub type_ids: &'a [u32],
}

/// What a loaded model is going to be asked for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Task {
    /// Sequence (pair) classification logits.
    Classify,
    /// Per-token hidden states.
    Embed,
}

pub trait MlBackend {
    /// Classification logits for one input.
    fn logits(&mut self, input: &Encoded<'_>) -> Result<Vec<f32>>;

    /// Last-layer hidden states, one row per token.
    fn hidden_states(&mut self, input: &Encoded<'_>) -> Result<Vec<Vec<f32>>>;
}
