pub type Result<T> = eyre::Result<T>;

/// Failures raised by deepscore itself, as opposed to errors bubbling up
/// from a wrapped library or model, which travel as plain `eyre::Report`s.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ScoreError {
    /// Unsupported discrete choice or input shape. Raised before any backend work.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
    /// A scoring backend is not compiled in or its artifacts cannot be found.
    #[error("backend unavailable: {0}")]
    BackendUnavailable(String),
    /// The metric exists in the catalog but has no implementation.
    #[error("not supported: {0}")]
    NotSupported(String),
}

impl ScoreError {
    pub fn invalid(msg: impl Into<String>) -> eyre::Report {
        Self::InvalidArgument(msg.into()).into()
    }

    pub fn unavailable(msg: impl Into<String>) -> eyre::Report {
        Self::BackendUnavailable(msg.into()).into()
    }

    pub fn unsupported(msg: impl Into<String>) -> eyre::Report {
        Self::NotSupported(msg.into()).into()
    }

    /// Recover the taxonomy error from a report, looking through wrapped context.
    #[must_use]
    pub fn of(report: &eyre::Report) -> Option<&Self> {
        report.chain().find_map(|e| e.downcast_ref::<Self>())
    }
}
