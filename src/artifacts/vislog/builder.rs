//! Visible pack builder
//!
//! Turns a [`DataPack`] and a [`FilterCollection`] into the [`VisiblePack`]
//! the log displays. The order of decisions:
//!
//! 1. A non-empty hash filter wins outright: show exactly the commits its
//!    hashes resolve to.
//! 2. Branch, root and structure filters select the *matching heads*; a commit
//!    passes that axis when it is reachable from one of them.
//! 3. Details filters are answered by the index for indexed roots, and by the
//!    cascade for the rest: first the in-memory prefix of recent commits, then,
//!    if that finds too few, the providers with a wider budget.
//! 4. Either axis matching nothing yields [`VisibleGraph::Empty`].

use crate::artifacts::filter::FilterCollection;
use crate::artifacts::filter::hash::HashFilter;
use crate::artifacts::filter::structure::visible_roots;
use crate::artifacts::graph::commit_id::{CommitIndex, RepositoryRoot};
use crate::artifacts::graph::permanent_graph::{PermanentGraph, SortOrder};
use crate::artifacts::graph::storage::CommitStorage;
use crate::artifacts::graph::visible_graph::VisibleGraph;
use crate::artifacts::vislog::cache::TopCommitsCache;
use crate::artifacts::vislog::commit_count::{CommitCountStage, StageBudget};
use crate::artifacts::vislog::data_pack::DataPack;
use crate::artifacts::vislog::index::DetailsIndex;
use crate::artifacts::vislog::metadata::{CommitDataGetter, CommitMetadata};
use crate::artifacts::vislog::provider::LogProvider;
use crate::artifacts::vislog::visible_pack::VisiblePack;
use derive_new::new;
use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::sync::Arc;

/// Commits allowed along one axis
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MatchingSet {
    /// The axis has no filter
    Unconstrained,
    /// Only these commits; an empty set excludes everything
    Matches(HashSet<CommitIndex>),
}

impl MatchingSet {
    pub fn matches_nothing(&self) -> bool {
        matches!(self, MatchingSet::Matches(set) if set.is_empty())
    }

    pub fn as_set(&self) -> Option<&HashSet<CommitIndex>> {
        match self {
            MatchingSet::Unconstrained => None,
            MatchingSet::Matches(set) => Some(set),
        }
    }

    pub fn contains(&self, index: CommitIndex) -> bool {
        self.as_set().is_none_or(|set| set.contains(&index))
    }

    /// Union with an explicit set; unconstrained already allows everything
    pub fn union(self, other: HashSet<CommitIndex>) -> Self {
        match self {
            MatchingSet::Unconstrained => MatchingSet::Unconstrained,
            MatchingSet::Matches(mut set) => {
                set.extend(other);
                MatchingSet::Matches(set)
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterResult {
    pub matching_commits: MatchingSet,
    pub can_request_more: bool,
    pub stage: CommitCountStage,
}

#[derive(new)]
pub struct VisiblePackBuilder {
    storage: Arc<CommitStorage>,
    top_commits: Arc<TopCommitsCache>,
    details_getter: Arc<dyn CommitDataGetter>,
    providers: BTreeMap<RepositoryRoot, Arc<dyn LogProvider>>,
    index: Arc<dyn DetailsIndex>,
    budget: StageBudget,
}

impl VisiblePackBuilder {
    pub fn build(
        &self,
        data_pack: &Arc<DataPack>,
        sort: SortOrder,
        filters: &FilterCollection,
        stage: CommitCountStage,
    ) -> (VisiblePack, CommitCountStage) {
        if let Some(hash_filter) = filters.active_hash() {
            return (self.apply_hash_filter(data_pack, hash_filter, filters, sort), stage);
        }

        let visible_roots = visible_roots(data_pack.roots(), filters.root(), filters.structure());
        let matching_heads = self.matching_heads(data_pack, &visible_roots, filters);
        let result = self.filter_by_details(data_pack, filters, stage, &visible_roots, &matching_heads);

        let visible_graph =
            if matching_heads.matches_nothing() || result.matching_commits.matches_nothing() {
                VisibleGraph::Empty
            } else {
                data_pack.permanent_graph().create_visible_graph(
                    sort,
                    matching_heads.as_set(),
                    result.matching_commits.as_set(),
                )
            };
        tracing::debug!(
            rows = visible_graph.len(),
            can_request_more = result.can_request_more,
            stage = ?result.stage,
            "visible pack built"
        );

        let pack = VisiblePack::new(
            Arc::clone(data_pack),
            visible_graph,
            result.can_request_more,
            filters.clone(),
        );
        (pack, result.stage)
    }

    fn apply_hash_filter(
        &self,
        data_pack: &Arc<DataPack>,
        hash_filter: &HashFilter,
        filters: &FilterCollection,
        sort: SortOrder,
    ) -> VisiblePack {
        let resolved = hash_filter
            .hashes()
            .iter()
            .flat_map(|hash| self.storage.resolve_prefix(hash))
            .collect::<HashSet<_>>();
        let visible_graph = data_pack
            .permanent_graph()
            .create_visible_graph(sort, None, Some(&resolved));

        VisiblePack::new(Arc::clone(data_pack), visible_graph, false, filters.hash_only())
    }

    /// Heads of the refs in `roots` passing the branch filter
    pub fn matching_heads(
        &self,
        data_pack: &DataPack,
        roots: &BTreeSet<RepositoryRoot>,
        filters: &FilterCollection,
    ) -> MatchingSet {
        if filters.branch().is_none() && filters.root().is_none() && filters.structure().is_none() {
            return MatchingSet::Unconstrained;
        }

        let heads = data_pack
            .branches()
            .iter()
            .filter(|vcs_ref| roots.contains(&vcs_ref.root))
            .filter(|vcs_ref| {
                filters
                    .branch()
                    .is_none_or(|branch| branch.matches(vcs_ref.name.as_ref()))
            })
            .map(|vcs_ref| vcs_ref.commit)
            .collect();

        MatchingSet::Matches(heads)
    }

    fn filter_by_details(
        &self,
        data_pack: &DataPack,
        filters: &FilterCollection,
        stage: CommitCountStage,
        visible_roots: &BTreeSet<RepositoryRoot>,
        matching_heads: &MatchingSet,
    ) -> FilterResult {
        let kinds = filters.details_kinds();
        if kinds.is_empty() {
            return FilterResult {
                matching_commits: MatchingSet::Unconstrained,
                can_request_more: false,
                stage,
            };
        }

        let mut cascade_roots = visible_roots.clone();
        let mut cascade_heads = matching_heads.clone();
        let mut filtered_with_index = None;
        if self.index.can_filter(kinds) {
            let (indexed, not_indexed): (BTreeSet<_>, BTreeSet<_>) = visible_roots
                .iter()
                .cloned()
                .partition(|root| self.index.is_indexed(root));

            if !indexed.is_empty() {
                let found = self.index.filter(&indexed, filters);
                tracing::debug!(roots = indexed.len(), matches = found.len(), "filtered with index");
                if not_indexed.is_empty() {
                    return FilterResult {
                        matching_commits: MatchingSet::Matches(found),
                        can_request_more: false,
                        stage,
                    };
                }
                cascade_heads = self.matching_heads(data_pack, &not_indexed, filters);
                cascade_roots = not_indexed;
                filtered_with_index = Some(found);
            }
        }

        let filtered_with_vcs = self.filter_with_vcs(
            data_pack.permanent_graph(),
            filters,
            &cascade_roots,
            &cascade_heads,
            stage,
        );

        let matching_commits = match filtered_with_index {
            None => filtered_with_vcs.matching_commits,
            Some(found) => filtered_with_vcs.matching_commits.union(found),
        };
        FilterResult {
            matching_commits,
            ..filtered_with_vcs
        }
    }

    /// In-memory pass on the initial stage, providers otherwise
    pub fn filter_with_vcs(
        &self,
        graph: &PermanentGraph,
        filters: &FilterCollection,
        roots: &BTreeSet<RepositoryRoot>,
        matching_heads: &MatchingSet,
        stage: CommitCountStage,
    ) -> FilterResult {
        let mut stage = stage;

        if stage.is_initial() {
            let found = self.filter_in_memory(graph, filters, roots, matching_heads);
            let limit = stage.limit(&self.budget);
            if found.len() >= limit {
                return FilterResult {
                    matching_commits: MatchingSet::Matches(found),
                    can_request_more: true,
                    stage,
                };
            }

            stage = stage.next();
            tracing::debug!(found = found.len(), limit, next = ?stage, "in-memory pass came up short");
        }

        let limit = stage.limit(&self.budget);
        let found = self.filter_with_providers(filters, roots, limit);
        FilterResult {
            can_request_more: found.len() >= limit,
            matching_commits: MatchingSet::Matches(found),
            stage,
        }
    }

    /// Scan the contiguous run of commits whose metadata is already loaded
    pub fn filter_in_memory(
        &self,
        graph: &PermanentGraph,
        filters: &FilterCollection,
        roots: &BTreeSet<RepositoryRoot>,
        matching_heads: &MatchingSet,
    ) -> HashSet<CommitIndex> {
        let mut found = HashSet::new();

        for commit in graph.all_commits() {
            let Some(metadata) = self.details_from_cache(commit.index) else {
                break;
            };
            if roots.contains(&metadata.root)
                && filters.matches_details(&metadata)
                && Self::matches_any_head(graph, commit.index, matching_heads)
            {
                found.insert(commit.index);
            }
        }

        found
    }

    fn matches_any_head(graph: &PermanentGraph, index: CommitIndex, heads: &MatchingSet) -> bool {
        match heads {
            MatchingSet::Unconstrained => true,
            MatchingSet::Matches(heads) => graph.is_reachable_from_any(index, heads),
        }
    }

    fn details_from_cache(&self, index: CommitIndex) -> Option<Arc<CommitMetadata>> {
        self.top_commits
            .get(index)
            .or_else(|| self.details_getter.commit_data_if_available(index))
    }

    fn filter_with_providers(
        &self,
        filters: &FilterCollection,
        roots: &BTreeSet<RepositoryRoot>,
        max_count: usize,
    ) -> HashSet<CommitIndex> {
        let mut found = HashSet::new();

        for (root, provider) in &self.providers {
            if !roots.contains(root) {
                continue;
            }
            if let Some(user) = filters.user()
                && user.user_names(root).is_empty()
            {
                tracing::debug!(root = %root, "no user names for root, skipping");
                continue;
            }

            let root_filters = match filters.structure() {
                Some(structure) => filters.clone().with_structure(structure.for_root(root)),
                None => filters.clone(),
            };

            match provider.commits_matching_filter(root, &root_filters, max_count) {
                Ok(commits) => {
                    for commit in commits {
                        match self.storage.index_of(&commit.hash, root) {
                            Some(index) => {
                                found.insert(index);
                            }
                            None => tracing::debug!(
                                root = %root,
                                hash = %commit.hash,
                                "ignoring commit unknown to the session"
                            ),
                        }
                    }
                }
                Err(error) => tracing::error!(root = %root, %error, "log provider failed"),
            }
        }

        found
    }
}
