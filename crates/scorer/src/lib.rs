//! Text scoring behind one dispatch point.
//!
//! A [`Registry`] maps metric names to handlers. Each handler validates the
//! request's discrete choices, promotes lone strings to one-element
//! sequences where a metric takes a collection, calls the metric in
//! [`deepscore_core`] or [`deepscore_ml`], and shapes a [`ScoreResult`].
//!
//! ```no_run
//! use deepscore::{Config, ScoreRequest};
//!
//! let request = ScoreRequest::new("The cat sat on the mat.", "The cat sat on the mat.")
//!     .with_variant("rouge1");
//! let result = deepscore::score("rouge", &request, &Config::default())?;
//! assert_eq!(result.as_scalar(), Some(1.0));
//! # Ok::<(), eyre::Report>(())
//! ```

mod handlers;
pub mod metric;
pub mod registry;
pub mod request;

use std::sync::LazyLock;

pub use deepscore_core::{BackendKind, Config, Result, ScoreError, ScoreResult, Texts};
pub use handlers::pii_score;
pub use metric::Metric;
pub use registry::{Handler, Registry};
pub use request::ScoreRequest;

static BUILTIN: LazyLock<Registry> = LazyLock::new(Registry::builtin);

/// Score `request` with the built-in metric called `metric`.
///
/// # Errors
///
/// See [`Registry::score`].
pub fn score(metric: &str, request: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
    BUILTIN.score(metric, request, config)
}
