use crate::artifacts::graph::commit_id::CommitIndex;
use crate::artifacts::vislog::metadata::CommitMetadata;
use std::cmp::Reverse;
use std::collections::{BTreeSet, HashMap};
use std::sync::{Arc, PoisonError, RwLock};

/// Default number of recent commits kept in memory
pub const DEFAULT_CACHE_SIZE: usize = 1000;

#[derive(Debug, Default)]
struct CacheEntries {
    by_index: HashMap<CommitIndex, Arc<CommitMetadata>>,
    /// Newest first; the last entry is evicted first
    by_age: BTreeSet<(Reverse<i64>, CommitIndex)>,
}

/// Metadata of the most recent commits
///
/// Shared read-mostly between builds. Storing more than `capacity` commits
/// evicts the oldest ones by committer timestamp, so what stays is a prefix of
/// the permanent graph order.
#[derive(Debug)]
pub struct TopCommitsCache {
    capacity: usize,
    entries: RwLock<CacheEntries>,
}

impl TopCommitsCache {
    pub fn new(capacity: usize) -> Self {
        TopCommitsCache {
            capacity,
            entries: RwLock::new(CacheEntries::default()),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn get(&self, index: CommitIndex) -> Option<Arc<CommitMetadata>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_index
            .get(&index)
            .cloned()
    }

    pub fn store(&self, metadata: impl IntoIterator<Item = Arc<CommitMetadata>>) {
        let mut entries = self.entries.write().unwrap_or_else(PoisonError::into_inner);

        for metadata in metadata {
            let key = (Reverse(metadata.committed_at), metadata.index);
            if let Some(previous) = entries.by_index.insert(metadata.index, metadata) {
                entries
                    .by_age
                    .remove(&(Reverse(previous.committed_at), previous.index));
            }
            entries.by_age.insert(key);
        }

        while entries.by_age.len() > self.capacity {
            if let Some((_, evicted)) = entries.by_age.pop_last() {
                entries.by_index.remove(&evicted);
            }
        }
    }

    pub fn len(&self) -> usize {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .by_index
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for TopCommitsCache {
    fn default() -> Self {
        Self::new(DEFAULT_CACHE_SIZE)
    }
}
