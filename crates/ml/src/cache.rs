//! Caller-owned model cache.
//!
//! The metric functions never cache: each call builds a model and drops it.
//! Callers scoring many examples can keep models here and use the `*_with`
//! variants instead. Entries live until [`ModelCache::evict`] or
//! [`ModelCache::clear`].

use std::collections::HashMap;

use deepscore_core::Result;
use tracing::debug;

use crate::device::Device;
use crate::model::Model;

/// Identity of a loaded model.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    pub metric: String,
    pub repo: String,
    pub device: Device,
}

impl CacheKey {
    #[must_use]
    pub fn new(metric: impl Into<String>, repo: impl Into<String>, device: Device) -> Self {
        Self {
            metric: metric.into(),
            repo: repo.into(),
            device,
        }
    }
}

pub struct ModelCache<M = Model> {
    models: HashMap<CacheKey, M>,
}

impl<M> Default for ModelCache<M> {
    fn default() -> Self {
        Self {
            models: HashMap::new(),
        }
    }
}

impl<M> ModelCache<M> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached model for `key`, loading it with `load` on a miss.
    ///
    /// # Errors
    ///
    /// Propagates the loader's error; nothing is cached in that case.
    pub fn get_or_insert_with<F>(&mut self, key: CacheKey, load: F) -> Result<&mut M>
    where
        F: FnOnce() -> Result<M>,
    {
        use std::collections::hash_map::Entry;

        match self.models.entry(key) {
            Entry::Occupied(entry) => {
                debug!(metric = %entry.key().metric, repo = %entry.key().repo, "model cache hit");
                Ok(entry.into_mut())
            }
            Entry::Vacant(entry) => {
                debug!(metric = %entry.key().metric, repo = %entry.key().repo, "model cache miss");
                let model = load()?;
                Ok(entry.insert(model))
            }
        }
    }

    /// Drop one model. Returns it if it was cached.
    pub fn evict(&mut self, key: &CacheKey) -> Option<M> {
        self.models.remove(key)
    }

    pub fn clear(&mut self) {
        self.models.clear();
    }

    #[must_use]
    pub fn contains(&self, key: &CacheKey) -> bool {
        self.models.contains_key(key)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.models.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.models.is_empty()
    }
}
