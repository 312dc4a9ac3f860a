//! Log providers
//!
//! A provider answers "which commits of this root match these filters" by
//! reading history itself, which is slower than the in-memory pass but sees
//! every commit. [`RepositoryLogProvider`] does so for a loose-object
//! repository:
//!
//! - start from every branch tip (and `HEAD`) passing the branch filter
//! - walk newest first, reading each commit once
//! - diff against the first parent only when a structure filter needs it

use crate::areas::repository::Repository;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::filter::FilterCollection;
use crate::artifacts::filter::branch::BranchFilter;
use crate::artifacts::graph::commit_id::{CommitId, RepositoryRoot};
use crate::artifacts::graph::storage::CommitStorage;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::log::tree_diff::TreeDiff;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::vislog::metadata::CommitMetadata;
use derive_new::new;
use std::path::PathBuf;
use std::sync::Arc;
use thiserror::Error;

/// A matching commit as reported by a provider
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct TimedCommit {
    pub hash: ObjectId,
    pub parents: Vec<ObjectId>,
    pub timestamp: i64,
}

#[derive(Error, Debug)]
pub enum ProviderError {
    #[error("I/O error in {root}: {source}")]
    Io {
        root: RepositoryRoot,
        #[source]
        source: std::io::Error,
    },

    #[error("Corrupt repository data in {root}: {message}")]
    CorruptObject { root: RepositoryRoot, message: String },

    #[error("Unknown repository root: {0}")]
    UnknownRoot(RepositoryRoot),
}

impl ProviderError {
    fn from_anyhow(root: &RepositoryRoot, error: anyhow::Error) -> Self {
        let message = format!("{error:#}");
        match error.downcast::<std::io::Error>() {
            Ok(source) => ProviderError::Io {
                root: root.clone(),
                source,
            },
            Err(_) => ProviderError::CorruptObject {
                root: root.clone(),
                message,
            },
        }
    }
}

pub trait LogProvider: Send + Sync {
    /// Up to `max_count` commits of `root` matching `filters`, newest first
    fn commits_matching_filter(
        &self,
        root: &RepositoryRoot,
        filters: &FilterCollection,
        max_count: usize,
    ) -> Result<Vec<TimedCommit>, ProviderError>;
}

#[derive(Debug, new)]
pub struct RepositoryLogProvider {
    repository: Arc<Repository>,
    storage: Arc<CommitStorage>,
}

impl RepositoryLogProvider {
    /// Tips to walk from: branches and HEAD accepted by `branch_filter`
    pub fn tips(
        repository: &Repository,
        branch_filter: Option<&BranchFilter>,
    ) -> anyhow::Result<Vec<(BranchName, ObjectId)>> {
        let mut tips = repository.refs().list_branches()?;
        if let Some(head) = repository.refs().read_head()? {
            tips.push((BranchName::head(), head));
        }

        Ok(tips
            .into_iter()
            .filter(|(name, _)| branch_filter.is_none_or(|filter| filter.matches(name.as_ref())))
            .collect())
    }

    /// Files changed by `commit` relative to its first parent
    pub fn changed_paths(
        repository: &Repository,
        commit: &Commit,
        filter: &PathFilter,
    ) -> anyhow::Result<Vec<PathBuf>> {
        let database = repository.database();
        let parent_tree = match commit.first_parent() {
            Some(parent) => Some(database.parse_object_as_commit(parent)?.tree_oid().clone()),
            None => None,
        };

        TreeDiff::new(database).changed_paths(parent_tree.as_ref(), Some(commit.tree_oid()), filter)
    }

    /// `None` for commits written after the session indexed this root
    fn metadata(&self, oid: &ObjectId, commit: &Commit) -> Option<CommitMetadata> {
        let root = self.repository.root();
        let index = self.storage.index_of(oid, root)?;
        let parents = commit
            .parents()
            .iter()
            .filter_map(|parent| self.storage.index_of(parent, root))
            .collect();

        Some(CommitMetadata::from_commit(
            index,
            CommitId::new(oid.clone(), root.clone()),
            parents,
            commit,
        ))
    }

    fn walk(&self, filters: &FilterCollection, max_count: usize) -> anyhow::Result<Vec<TimedCommit>> {
        let tips = Self::tips(&self.repository, filters.branch())?
            .into_iter()
            .map(|(_, oid)| oid);
        let path_filter = filters
            .structure()
            .map(|structure| PathFilter::new(structure.files_for_root(self.repository.root())));

        let mut matching = Vec::new();
        for entry in RevList::new(self.repository.database(), tips) {
            if matching.len() >= max_count {
                break;
            }

            let (oid, commit) = entry?;
            let Some(mut metadata) = self.metadata(&oid, &commit) else {
                tracing::debug!(hash = %oid, "skipping commit unknown to the session");
                continue;
            };
            if let Some(path_filter) = &path_filter {
                metadata =
                    metadata.with_changed_paths(Self::changed_paths(&self.repository, &commit, path_filter)?);
            }

            if filters.matches_details(&metadata) {
                matching.push(TimedCommit::new(
                    oid,
                    commit.parents().to_vec(),
                    commit.committer().timestamp().timestamp(),
                ));
            }
        }

        Ok(matching)
    }
}

impl LogProvider for RepositoryLogProvider {
    fn commits_matching_filter(
        &self,
        root: &RepositoryRoot,
        filters: &FilterCollection,
        max_count: usize,
    ) -> Result<Vec<TimedCommit>, ProviderError> {
        if root != self.repository.root() {
            return Err(ProviderError::UnknownRoot(root.clone()));
        }

        let started = std::time::Instant::now();
        let matching = self
            .walk(filters, max_count)
            .map_err(|error| ProviderError::from_anyhow(root, error))?;
        tracing::debug!(
            root = %root,
            matches = matching.len(),
            max_count,
            elapsed = ?started.elapsed(),
            "provider walk finished"
        );

        Ok(matching)
    }
}
