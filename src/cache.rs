use lru_mem::{HeapSize, LruCache};

use crate::git::batch::CommitInfo;

/// Nominal per-entry budget used to translate an entry-count capacity
/// into the byte budget `lru_mem` works with.
const NOMINAL_ENTRY_BYTES: usize = 512;

impl HeapSize for CommitInfo {
    fn heap_size(&self) -> usize {
        self.hash.heap_size()
            + self.short_hash.heap_size()
            + self.subject.heap_size()
            + self.author.heap_size()
    }
}

/// Bounded LRU for commit metadata, keyed by full object hash.
///
/// Eviction is always safe: every value is re-derivable from the
/// repository with one batched `git show`.
pub struct CommitInfoCache {
    inner: LruCache<String, CommitInfo>,
}

impl CommitInfoCache {
    pub fn new(capacity_entries: usize) -> Self {
        Self {
            inner: LruCache::new(capacity_entries.max(1) * NOMINAL_ENTRY_BYTES),
        }
    }

    pub fn get(&mut self, hash: &str) -> Option<CommitInfo> {
        self.inner.get(hash).cloned()
    }

    pub fn put(&mut self, info: CommitInfo) {
        // An entry too large for the budget is simply not cached.
        let _ = self.inner.insert(info.hash.clone(), info);
    }

    /// Split `hashes` into those already cached and those needing a load.
    pub fn partition<'h>(
        &mut self,
        hashes: &'h [String],
    ) -> (Vec<CommitInfo>, Vec<&'h String>) {
        let mut cached = Vec::new();
        let mut missing = Vec::new();
        for hash in hashes {
            match self.inner.get(hash) {
                Some(info) => cached.push(info.clone()),
                None => missing.push(hash),
            }
        }
        (cached, missing)
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }
}
