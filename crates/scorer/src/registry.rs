use std::collections::HashMap;

use deepscore_core::{Config, Result, ScoreError, ScoreResult};
use tracing::{debug, info_span, warn};

use crate::handlers;
use crate::metric::Metric;
use crate::request::ScoreRequest;

/// A scoring operation: validate the request, call the metric, shape the result.
pub type Handler = fn(&ScoreRequest, &Config) -> Result<ScoreResult>;

/// Metric name to handler.
///
/// [`Registry::builtin`] holds the whole catalog; [`Registry::register`]
/// adds or replaces metrics by name.
#[derive(Clone)]
pub struct Registry {
    handlers: HashMap<String, Handler>,
}

impl Registry {
    /// An empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self {
            handlers: HashMap::new(),
        }
    }

    /// Every built-in metric.
    #[must_use]
    pub fn builtin() -> Self {
        let mut registry = Self::new();
        for metric in Metric::ALL {
            registry.register(metric.as_str(), handlers::handler(metric));
        }
        registry
    }

    /// Add a metric, replacing any handler already registered under `name`.
    pub fn register(&mut self, name: impl Into<String>, handler: Handler) -> &mut Self {
        let name = name.into();
        if self.handlers.insert(name.clone(), handler).is_some() {
            debug!(%name, "metric handler replaced");
        }
        self
    }

    #[must_use]
    pub fn contains(&self, name: &str) -> bool {
        self.handlers.contains_key(name)
    }

    /// Registered names, sorted.
    #[must_use]
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Run the metric registered as `name`.
    ///
    /// # Errors
    ///
    /// Returns `InvalidArgument` for unknown names, missing fields or bad
    /// choices; otherwise whatever the metric returns.
    pub fn score(&self, name: &str, request: &ScoreRequest, config: &Config) -> Result<ScoreResult> {
        let span = info_span!("score", metric = name);
        let _enter = span.enter();

        let Some(handler) = self.handlers.get(name) else {
            return Err(ScoreError::invalid(format!(
                "unknown metric '{name}' (known: {})",
                self.names().join(", ")
            )));
        };

        debug!(
            targets = request.target.as_ref().map_or(0, |t| t.len()),
            predictions = request.prediction.as_ref().map_or(0, |p| p.len()),
            variant = request.variant.as_deref(),
            model = request.model.as_deref(),
            "dispatching"
        );
        match handler(request, config) {
            Ok(result) => {
                debug!(shape = result.kind(), "scored");
                Ok(result)
            }
            Err(e) => {
                match ScoreError::of(&e) {
                    Some(kind) => debug!(%kind, "scoring rejected"),
                    None => warn!(error = %e, "scoring failed"),
                }
                Err(e)
            }
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::builtin()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("metrics", &self.names())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn length_ratio(req: &ScoreRequest, _config: &Config) -> Result<ScoreResult> {
        let target = req.target.as_ref().and_then(|t| t.first()).unwrap_or_default();
        let prediction = req.prediction.as_ref().and_then(|p| p.first()).unwrap_or_default();
        #[allow(clippy::cast_precision_loss)]
        Ok(ScoreResult::Scalar(prediction.len() as f64 / target.len().max(1) as f64))
    }

    #[test]
    fn builtin_has_whole_catalog() {
        let registry = Registry::builtin();
        assert_eq!(registry.names().len(), Metric::ALL.len());
        assert!(registry.contains("quasi_exact_match"));
    }

    #[test]
    fn custom_metric_can_be_registered() {
        let mut registry = Registry::builtin();
        registry.register("length_ratio", length_ratio);
        let result = registry
            .score(
                "length_ratio",
                &ScoreRequest::new("abcd", "ab"),
                &Config::default(),
            )
            .unwrap();
        assert_eq!(result, ScoreResult::Scalar(0.5));
    }

    #[test]
    fn unknown_metric_is_invalid() {
        let err = Registry::new()
            .score("rouge", &ScoreRequest::default(), &Config::default())
            .unwrap_err();
        assert!(matches!(
            ScoreError::of(&err),
            Some(ScoreError::InvalidArgument(_))
        ));
    }
}
