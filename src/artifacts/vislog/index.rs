//! Details indexes
//!
//! An index answers details filters for the roots it covers without walking
//! history. Roots it does not cover fall back to the cache and providers.

use crate::artifacts::filter::{FilterCollection, FilterKind};
use crate::artifacts::graph::commit_id::{CommitIndex, RepositoryRoot};
use crate::artifacts::vislog::metadata::CommitMetadata;
use std::collections::{BTreeSet, HashMap, HashSet};
use std::sync::Arc;

pub trait DetailsIndex: Send + Sync {
    /// Whether every filter kind in `kinds` can be answered
    fn can_filter(&self, kinds: FilterKind) -> bool;

    fn is_indexed(&self, root: &RepositoryRoot) -> bool;

    /// Commits of the indexed `roots` matching every details filter
    fn filter(
        &self,
        roots: &BTreeSet<RepositoryRoot>,
        filters: &FilterCollection,
    ) -> HashSet<CommitIndex>;
}

/// Index covering nothing
#[derive(Debug, Default, Clone, Copy)]
pub struct NoIndex;

impl DetailsIndex for NoIndex {
    fn can_filter(&self, _kinds: FilterKind) -> bool {
        false
    }

    fn is_indexed(&self, _root: &RepositoryRoot) -> bool {
        false
    }

    fn filter(
        &self,
        _roots: &BTreeSet<RepositoryRoot>,
        _filters: &FilterCollection,
    ) -> HashSet<CommitIndex> {
        HashSet::new()
    }
}

/// In-memory index over fully loaded commit metadata
#[derive(Debug)]
pub struct MetadataIndex {
    roots: HashMap<RepositoryRoot, Vec<Arc<CommitMetadata>>>,
    supported: FilterKind,
}

impl MetadataIndex {
    pub fn new() -> Self {
        MetadataIndex {
            roots: HashMap::new(),
            supported: FilterKind::all(),
        }
    }

    /// Index every commit of `root`
    ///
    /// Structure filtering stays available only while every indexed commit
    /// carries its changed paths.
    pub fn index_root(&mut self, root: RepositoryRoot, commits: Vec<Arc<CommitMetadata>>) {
        if commits
            .iter()
            .any(|metadata| metadata.changed_paths.is_none())
        {
            self.supported.remove(FilterKind::STRUCTURE);
        }
        tracing::debug!(root = %root, commits = commits.len(), "indexed repository root");
        self.roots.insert(root, commits);
    }

    pub fn indexed_roots(&self) -> impl Iterator<Item = &RepositoryRoot> {
        self.roots.keys()
    }
}

impl Default for MetadataIndex {
    fn default() -> Self {
        Self::new()
    }
}

impl DetailsIndex for MetadataIndex {
    fn can_filter(&self, kinds: FilterKind) -> bool {
        self.supported.contains(kinds)
    }

    fn is_indexed(&self, root: &RepositoryRoot) -> bool {
        self.roots.contains_key(root)
    }

    fn filter(
        &self,
        roots: &BTreeSet<RepositoryRoot>,
        filters: &FilterCollection,
    ) -> HashSet<CommitIndex> {
        roots
            .iter()
            .filter_map(|root| self.roots.get(root))
            .flatten()
            .filter(|metadata| filters.matches_details(metadata))
            .map(|metadata| metadata.index)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::filter::details::UserFilter;
    use crate::artifacts::vislog::metadata::tests::metadata;
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    #[test]
    fn no_index_filters_nothing() {
        assert!(!NoIndex.can_filter(FilterKind::USER));
        assert!(!NoIndex.is_indexed(&RepositoryRoot::new("/repo")));
    }

    #[test]
    fn metadata_index_answers_for_requested_roots() {
        let root = RepositoryRoot::new("/repo");
        let mut index = MetadataIndex::new();
        index.index_root(
            root.clone(),
            vec![
                Arc::new(metadata(0, "Ada", "one")),
                Arc::new(metadata(1, "Linus", "two")),
                Arc::new(metadata(2, "Ada", "three")),
            ],
        );
        let filters = FilterCollection::new().with_user(UserFilter::new(vec!["ada".to_string()]));

        assert!(index.is_indexed(&root));
        assert_eq!(
            index.filter(&BTreeSet::from([root]), &filters),
            HashSet::from([CommitIndex::new(0), CommitIndex::new(2)])
        );
        assert!(index.filter(&BTreeSet::new(), &filters).is_empty());
    }

    #[test]
    fn structure_support_needs_changed_paths() {
        let mut detailed = MetadataIndex::new();
        detailed.index_root(
            RepositoryRoot::new("/repo"),
            vec![Arc::new(metadata(0, "Ada", "one").with_changed_paths(vec![PathBuf::from("a")]))],
        );
        let mut plain = MetadataIndex::new();
        plain.index_root(RepositoryRoot::new("/repo"), vec![Arc::new(metadata(0, "Ada", "one"))]);

        assert!(detailed.can_filter(FilterKind::USER | FilterKind::STRUCTURE));
        assert!(plain.can_filter(FilterKind::USER | FilterKind::TEXT));
        assert!(!plain.can_filter(FilterKind::STRUCTURE));
    }
}
