use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use parking_lot::RwLock;

use crate::{Extractor, FeatureError, FeatureSequence};

/// Read-through cache of extracted sequences keyed by source path.
///
/// Entries are never replaced: when two threads extract the same file
/// concurrently, the first insert wins and both callers get that entry.
/// Failures are not cached.
#[derive(Debug, Default)]
pub struct FeatureCache {
    entries: RwLock<HashMap<String, Arc<FeatureSequence>>>,
}

impl FeatureCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached sequence for `key`, if any.
    pub fn get(&self, key: &str) -> Option<Arc<FeatureSequence>> {
        self.entries.read().get(key).cloned()
    }

    /// Inserts `seq` unless `key` is already present; returns the stored entry.
    pub fn insert(&self, key: String, seq: FeatureSequence) -> Arc<FeatureSequence> {
        let mut entries = self.entries.write();
        entries.entry(key).or_insert_with(|| Arc::new(seq)).clone()
    }

    /// Returns the cached sequence for `path` or extracts and caches it.
    ///
    /// The key is the canonical path when it resolves, the given path
    /// otherwise.
    pub fn get_or_extract(
        &self,
        extractor: &Extractor,
        path: &Path,
    ) -> Result<Arc<FeatureSequence>, FeatureError> {
        let key = cache_key(path);
        if let Some(hit) = self.get(&key) {
            return Ok(hit);
        }
        // Extract outside the lock.
        let seq = extractor.extract_file(path)?;
        Ok(self.insert(key, seq))
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

fn cache_key(path: &Path) -> String {
    path.canonicalize()
        .unwrap_or_else(|_| path.to_path_buf())
        .to_string_lossy()
        .into_owned()
}
