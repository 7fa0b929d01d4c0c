//! Compute device selection.

use std::fmt;

use deepscore_core::{Result, ScoreError};
use tracing::debug;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Device {
    Cpu,
    Cuda(usize),
}

impl Device {
    /// Resolve a device string. `None` and `"auto"` prefer CUDA when it is
    /// available right now and fall back to CPU.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for anything other than `auto`, `cpu`,
    /// `cuda` or `cuda:N`.
    pub fn resolve(requested: Option<&str>) -> Result<Self> {
        let requested = requested.map(str::trim).filter(|s| !s.is_empty());
        let device = match requested.map(str::to_ascii_lowercase).as_deref() {
            None | Some("auto") => {
                if cuda_available() {
                    Self::Cuda(0)
                } else {
                    Self::Cpu
                }
            }
            Some("cpu") => Self::Cpu,
            Some("cuda") => Self::Cuda(0),
            Some(other) => match other.strip_prefix("cuda:").map(str::parse::<usize>) {
                Some(Ok(ordinal)) => Self::Cuda(ordinal),
                _ => {
                    return Err(ScoreError::invalid(format!(
                        "device '{other}' is not one of auto, cpu, cuda, cuda:N"
                    )))
                }
            },
        };
        debug!(?requested, %device, "device resolved");
        Ok(device)
    }

    #[must_use]
    pub const fn is_cuda(&self) -> bool {
        matches!(self, Self::Cuda(_))
    }
}

impl fmt::Display for Device {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Cpu => f.write_str("cpu"),
            Self::Cuda(n) => write!(f, "cuda:{n}"),
        }
    }
}

/// Whether an accelerator can be used by a compiled-in backend.
#[must_use]
pub fn cuda_available() -> bool {
    #[cfg(all(feature = "cuda", feature = "candle"))]
    if candle_core::utils::cuda_is_available() {
        return true;
    }

    #[cfg(all(feature = "cuda", feature = "onnx"))]
    {
        use ort::execution_providers::ExecutionProvider as _;
        if ort::execution_providers::CUDAExecutionProvider::default()
            .is_available()
            .unwrap_or(false)
        {
            return true;
        }
    }

    false
}
