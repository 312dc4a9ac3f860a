//! Commit index storage
//!
//! Maps every discovered [`CommitId`] to a dense [`CommitIndex`] and back.
//! Indices are handed out in discovery order and never reused, so the mapping
//! is a bijection for the lifetime of a session.
//!
//! Hashes are additionally kept in a sorted map so that partial hashes can be
//! resolved with a single range scan instead of a full table walk.

use crate::artifacts::graph::commit_id::{CommitId, CommitIndex, RepositoryRoot};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

#[derive(Debug, Default)]
pub struct CommitStorage {
    ids: Vec<CommitId>,
    indices: HashMap<CommitId, CommitIndex>,
    by_hash: BTreeMap<String, Vec<CommitIndex>>,
}

impl CommitStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Index of `commit_id`, assigning the next free one on first sight
    ///
    /// Fails once every `u32` index is taken.
    pub fn get_or_insert(&mut self, commit_id: CommitId) -> anyhow::Result<CommitIndex> {
        if let Some(index) = self.indices.get(&commit_id) {
            return Ok(*index);
        }

        let index = next_index(self.ids.len())?;
        self.by_hash
            .entry(commit_id.hash.as_ref().to_string())
            .or_default()
            .push(index);
        self.indices.insert(commit_id.clone(), index);
        self.ids.push(commit_id);

        Ok(index)
    }

    pub fn index_of(&self, hash: &ObjectId, root: &RepositoryRoot) -> Option<CommitIndex> {
        self.indices
            .get(&CommitId::new(hash.clone(), root.clone()))
            .copied()
    }

    pub fn commit_id(&self, index: CommitIndex) -> Option<&CommitId> {
        self.ids.get(index.as_usize())
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// Resolve a partial hash, one commit per repository root at most
    ///
    /// A root contributes a commit only when the prefix matches exactly one of
    /// its commits. Invalid, unknown and ambiguous prefixes resolve to nothing.
    pub fn resolve_prefix(&self, prefix: &str) -> Vec<CommitIndex> {
        let Some(prefix) = ObjectId::normalize_prefix(prefix) else {
            tracing::debug!(prefix, "ignoring malformed hash prefix");
            return Vec::new();
        };

        let mut per_root = BTreeMap::<&RepositoryRoot, Vec<CommitIndex>>::new();
        for (_, indices) in self
            .by_hash
            .range::<str, _>((Bound::Included(prefix.as_str()), Bound::Unbounded))
            .take_while(|(hash, _)| hash.starts_with(&prefix))
        {
            for index in indices {
                let root = &self.ids[index.as_usize()].root;
                per_root.entry(root).or_default().push(*index);
            }
        }

        let mut resolved = Vec::new();
        for (root, candidates) in per_root {
            match candidates.as_slice() {
                [single] => resolved.push(*single),
                _ => tracing::debug!(
                    prefix = %prefix,
                    root = %root,
                    candidates = candidates.len(),
                    "ambiguous hash prefix"
                ),
            }
        }
        resolved.sort();

        resolved
    }
}

fn next_index(assigned: usize) -> anyhow::Result<CommitIndex> {
    u32::try_from(assigned)
        .map(CommitIndex::new)
        .with_context(|| format!("commit storage is full after {assigned} commits"))
}
