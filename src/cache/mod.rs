use std::collections::HashMap;
use std::num::NonZeroUsize;
use std::sync::Arc;

use lru::LruCache;
use parking_lot::Mutex;
use serde_json::Value;
use tracing::debug;

pub const DEFAULT_CAPACITY: usize = 256;

/// Something that can mark the cached views of a route stale.
pub trait Revalidate: Send + Sync {
    fn revalidate_path(&self, path: &str);
}

struct Views {
    entries: LruCache<String, Value>,
    // Bumped on every revalidation of the path
    generations: HashMap<String, u64>,
}

/// Rendered read views, keyed by route path plus a normalized query.
///
/// A view stays cached until a write revalidates its path or it is evicted by
/// newer views. Revalidating a path drops the view for every query under it.
/// Readers take a [`ViewCache::generation`] before loading and hand it back to
/// [`ViewCache::insert`], which refuses views loaded before a revalidation.
#[derive(Clone)]
pub struct ViewCache {
    views: Arc<Mutex<Views>>,
}

impl Default for ViewCache {
    fn default() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }
}

impl ViewCache {
    #[cfg(test)]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = NonZeroUsize::new(capacity).unwrap_or(NonZeroUsize::MIN);
        Self {
            views: Arc::new(Mutex::new(Views {
                entries: LruCache::new(capacity),
                generations: HashMap::new(),
            })),
        }
    }

    pub fn key(path: &str, query: Option<&str>) -> String {
        match query {
            Some(q) if !q.is_empty() => format!("{path}?{q}"),
            _ => path.to_string(),
        }
    }

    pub fn get(&self, key: &str) -> Option<Value> {
        self.views.lock().entries.get(key).cloned()
    }

    /// Current generation of `path`. Take it before loading a view of that path.
    pub fn generation(&self, path: &str) -> u64 {
        self.views.lock().generations.get(path).copied().unwrap_or(0)
    }

    /// Store a view loaded at `generation`. Returns false, storing nothing, if the
    /// path was revalidated since.
    pub fn insert(&self, key: String, generation: u64, view: Value) -> bool {
        let mut views = self.views.lock();

        let current = views.generations.get(key_path(&key)).copied().unwrap_or(0);
        if current != generation {
            debug!(key = %key, "discarding view loaded before revalidation");
            return false;
        }

        views.entries.put(key, view);
        true
    }

    #[cfg(test)]
    pub fn len(&self) -> usize {
        self.views.lock().entries.len()
    }
}

fn key_path(key: &str) -> &str {
    key.split_once('?').map_or(key, |(path, _)| path)
}

impl Revalidate for ViewCache {
    fn revalidate_path(&self, path: &str) {
        let mut views = self.views.lock();

        *views.generations.entry(path.to_string()).or_insert(0) += 1;

        let stale: Vec<String> = views
            .entries
            .iter()
            .filter(|(key, _)| key_path(key) == path)
            .map(|(key, _)| key.clone())
            .collect();
        for key in &stale {
            views.entries.pop(key);
        }

        debug!(path, dropped = stale.len(), "revalidated path");
    }
}
