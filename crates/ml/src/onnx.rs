//! ONNX Runtime backend. Works with any architecture exported to `onnx/model.onnx`.

use std::borrow::Cow;
use std::path::Path;

use deepscore_core::Result;
use ort::session::{Session, SessionInputValue};
use ort::value::Tensor;
use tracing::debug;

use crate::backend::{Encoded, MlBackend};
use crate::device::Device;

pub struct OnnxBackend {
    session: Session,
    wants_type_ids: bool,
}

impl OnnxBackend {
    /// # Errors
    ///
    /// Returns an error if the ONNX session cannot be built.
    #[allow(unused_variables)]
    pub fn load(model_path: &Path, device: Device) -> Result<Self> {
        let builder = Session::builder()?;

        #[cfg(feature = "cuda")]
        let builder = if let Device::Cuda(ordinal) = device {
            builder.with_execution_providers([
                ort::execution_providers::CUDAExecutionProvider::default()
                    .with_device_id(i32::try_from(ordinal)?)
                    .build(),
            ])?
        } else {
            builder
        };

        #[cfg(feature = "coreml")]
        let builder = builder.with_execution_providers([
            ort::execution_providers::CoreMLExecutionProvider::default().build(),
        ])?;

        let session = builder.commit_from_file(model_path)?;
        let wants_type_ids = session.inputs.iter().any(|i| i.name == "token_type_ids");
        debug!(
            inputs = session.inputs.len(),
            wants_type_ids, "onnx session ready"
        );
        Ok(Self {
            session,
            wants_type_ids,
        })
    }

    /// Run the session and return the first output flattened, with its shape.
    fn run(&mut self, input: &Encoded<'_>) -> Result<(Vec<usize>, Vec<f32>)> {
        let to_i64 = |xs: &[u32]| xs.iter().map(|&x| i64::from(x)).collect::<Vec<i64>>();
        let len = i64::try_from(input.ids.len())?;
        let shape = vec![1i64, len];

        let mut inputs: Vec<(Cow<'_, str>, SessionInputValue<'_>)> = vec![
            (
                "input_ids".into(),
                Tensor::from_array((shape.clone(), to_i64(input.ids)))?.into(),
            ),
            (
                "attention_mask".into(),
                Tensor::from_array((shape.clone(), to_i64(input.attention_mask)))?.into(),
            ),
        ];
        if self.wants_type_ids {
            inputs.push((
                "token_type_ids".into(),
                Tensor::from_array((shape, to_i64(input.type_ids)))?.into(),
            ));
        }

        let outputs = self.session.run(inputs)?;
        let view = outputs[0].try_extract_array::<f32>()?;
        let dims = view.shape().to_vec();
        let values = view.iter().copied().collect();
        Ok((dims, values))
    }
}

impl MlBackend for OnnxBackend {
    fn logits(&mut self, input: &Encoded<'_>) -> Result<Vec<f32>> {
        let (dims, values) = self.run(input)?;
        if dims.len() != 2 {
            return Err(eyre::eyre!(
                "expected logits of shape [1, labels], model returned {dims:?}"
            ));
        }
        Ok(values)
    }

    fn hidden_states(&mut self, input: &Encoded<'_>) -> Result<Vec<Vec<f32>>> {
        let (dims, values) = self.run(input)?;
        let &[_, tokens, hidden] = dims.as_slice() else {
            return Err(eyre::eyre!(
                "expected hidden states of shape [1, tokens, hidden], model returned {dims:?}"
            ));
        };
        debug_assert_eq!(values.len(), tokens * hidden);
        Ok(values.chunks(hidden.max(1)).map(<[f32]>::to_vec).collect())
    }
}
