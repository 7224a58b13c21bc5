//! Model caching utilities for sharing loaded weights across pipelines.
//!
//! Building two pipelines over the same checkpoint should not load the
//! weights twice. The cache stores model instances by type and key; clones
//! handed out share the underlying weight tensors.

use std::any::{Any, TypeId};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Trait implemented by model option types to generate a stable cache key.
pub trait ModelOptions {
    fn cache_key(&self) -> String;
}

type CacheStorage = HashMap<(TypeId, String), Arc<dyn Any + Send + Sync>>;

/// A thread-safe cache for model instances.
pub struct ModelCache {
    cache: Mutex<CacheStorage>,
}

impl ModelCache {
    /// Create a new empty model cache.
    pub fn new() -> Self {
        Self {
            cache: Mutex::new(HashMap::new()),
        }
    }

    /// Get or create a model from the cache.
    ///
    /// If a model with the given key already exists, a clone is returned.
    /// Otherwise `loader` is called and its result cached. The lock is not
    /// held while the loader runs, so two threads racing on a cold key may
    /// both load; the second insert wins and both models are usable.
    pub fn get_or_create<M, F>(&self, key: &str, loader: F) -> anyhow::Result<M>
    where
        M: Clone + Send + Sync + 'static,
        F: FnOnce() -> anyhow::Result<M>,
    {
        let cache_key = (TypeId::of::<M>(), key.to_string());

        {
            let cache = self.lock()?;
            if let Some(cached) = cache.get(&cache_key) {
                if let Some(model) = cached.downcast_ref::<M>() {
                    return Ok(model.clone());
                }
            }
        }

        let model = loader()?;

        {
            let mut cache = self.lock()?;
            cache.insert(
                cache_key,
                Arc::new(model.clone()) as Arc<dyn Any + Send + Sync>,
            );
        }

        Ok(model)
    }

    /// Clear all cached models.
    pub fn clear(&self) -> anyhow::Result<()> {
        self.lock()?.clear();
        Ok(())
    }

    /// Number of cached models.
    pub fn len(&self) -> anyhow::Result<usize> {
        Ok(self.lock()?.len())
    }

    /// Whether the cache is empty.
    pub fn is_empty(&self) -> anyhow::Result<bool> {
        Ok(self.lock()?.is_empty())
    }

    fn lock(&self) -> anyhow::Result<std::sync::MutexGuard<'_, CacheStorage>> {
        self.cache
            .lock()
            .map_err(|_| anyhow::anyhow!("model cache lock poisoned"))
    }
}

impl Default for ModelCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Global model cache instance shared by all pipeline builders.
static GLOBAL_MODEL_CACHE: once_cell::sync::Lazy<ModelCache> =
    once_cell::sync::Lazy::new(ModelCache::new);

/// Get a reference to the global model cache.
pub fn global_cache() -> &'static ModelCache {
    &GLOBAL_MODEL_CACHE
}
