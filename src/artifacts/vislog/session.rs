//! Log session
//!
//! Opens a set of repositories and assembles everything a build needs: the
//! commit storage, the permanent graph and refs, the recent-commits cache, an
//! optional details index and one provider per root.

use crate::areas::repository::Repository;
use crate::artifacts::filter::FilterCollection;
use crate::artifacts::graph::commit_id::{CommitId, CommitIndex, RepositoryRoot};
use crate::artifacts::graph::permanent_graph::{GraphCommit, PermanentGraph, SortOrder};
use crate::artifacts::graph::storage::CommitStorage;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::log::rev_list::RevList;
use crate::artifacts::vislog::builder::VisiblePackBuilder;
use crate::artifacts::vislog::cache::{DEFAULT_CACHE_SIZE, TopCommitsCache};
use crate::artifacts::vislog::commit_count::{CommitCountStage, StageBudget};
use crate::artifacts::vislog::data_pack::{DataPack, VcsRef};
use crate::artifacts::vislog::index::{DetailsIndex, MetadataIndex, NoIndex};
use crate::artifacts::vislog::metadata::{CommitMetadata, MetadataStore, OwnerThreadGetter};
use crate::artifacts::vislog::provider::{LogProvider, RepositoryLogProvider};
use crate::artifacts::vislog::visible_pack::VisiblePack;
use anyhow::Context;
use std::collections::{BTreeMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub budget: StageBudget,
    pub cache_size: usize,
    /// Roots answered by the in-memory index; their changed paths are read up front
    pub indexed_roots: Vec<PathBuf>,
    /// Name the `me` user keyword stands for
    pub current_user: Option<String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            budget: StageBudget::default(),
            cache_size: DEFAULT_CACHE_SIZE,
            indexed_roots: Vec::new(),
            current_user: None,
        }
    }
}

pub struct LogSession {
    repositories: BTreeMap<RepositoryRoot, Arc<Repository>>,
    storage: Arc<CommitStorage>,
    data_pack: Arc<DataPack>,
    top_commits: Arc<TopCommitsCache>,
    loaded: Arc<MetadataStore>,
    builder: VisiblePackBuilder,
    current_user: Option<String>,
}

/// Commits of one root read during the initial walk
struct LoadedRoot {
    graph_commits: Vec<GraphCommit>,
    metadata: Vec<Arc<CommitMetadata>>,
    refs: Vec<VcsRef>,
}

impl LogSession {
    pub fn open(
        paths: impl IntoIterator<Item = impl AsRef<Path>>,
        config: SessionConfig,
    ) -> anyhow::Result<Self> {
        let indexed = config
            .indexed_roots
            .iter()
            .map(|path| {
                path.canonicalize()
                    .with_context(|| format!("indexed root {} does not exist", path.display()))
            })
            .collect::<anyhow::Result<HashSet<_>>>()?;

        let mut repositories = BTreeMap::new();
        for path in paths {
            let repository = Repository::open(path.as_ref())?;
            repositories.insert(repository.root().clone(), Arc::new(repository));
        }
        if repositories.is_empty() {
            anyhow::bail!("no repository roots given");
        }

        let mut storage = CommitStorage::new();
        let mut graph_commits = Vec::new();
        let mut refs = Vec::new();
        let mut top_metadata = Vec::new();
        let mut index = MetadataIndex::new();
        for (root, repository) in &repositories {
            let with_paths = indexed.contains(root.path());
            let loaded = Self::load_root(repository, &mut storage, with_paths)?;
            tracing::debug!(
                root = %root,
                commits = loaded.graph_commits.len(),
                refs = loaded.refs.len(),
                "loaded repository root"
            );

            if with_paths {
                index.index_root(root.clone(), loaded.metadata.clone());
            }
            graph_commits.extend(loaded.graph_commits);
            refs.extend(loaded.refs);
            top_metadata.extend(loaded.metadata);
        }

        let heads = refs.iter().map(|vcs_ref| vcs_ref.commit).collect::<Vec<_>>();
        let permanent_graph = PermanentGraph::new(graph_commits, heads);
        let data_pack = Arc::new(DataPack::new(
            permanent_graph,
            refs,
            repositories.keys().cloned().collect(),
        ));

        let top_commits = Arc::new(TopCommitsCache::new(config.cache_size));
        top_commits.store(top_metadata);

        let storage = Arc::new(storage);
        let providers = repositories
            .iter()
            .map(|(root, repository)| {
                let provider: Arc<dyn LogProvider> = Arc::new(RepositoryLogProvider::new(
                    Arc::clone(repository),
                    Arc::clone(&storage),
                ));
                (root.clone(), provider)
            })
            .collect();
        let details_index: Arc<dyn DetailsIndex> = if indexed.is_empty() {
            Arc::new(NoIndex)
        } else {
            Arc::new(index)
        };

        let loaded = Arc::new(MetadataStore::new());
        let details_getter = OwnerThreadGetter::spawn(loaded.clone())?;
        let builder = VisiblePackBuilder::new(
            Arc::clone(&storage),
            Arc::clone(&top_commits),
            Arc::new(details_getter),
            providers,
            details_index,
            config.budget,
        );

        Ok(LogSession {
            repositories,
            storage,
            data_pack,
            top_commits,
            loaded,
            builder,
            current_user: config.current_user,
        })
    }

    fn load_root(
        repository: &Repository,
        storage: &mut CommitStorage,
        with_paths: bool,
    ) -> anyhow::Result<LoadedRoot> {
        let root = repository.root();
        let tips = RepositoryLogProvider::tips(repository, None)?;

        let mut commits = Vec::new();
        for entry in RevList::new(repository.database(), tips.iter().map(|(_, oid)| oid.clone())) {
            let (oid, commit) = entry.with_context(|| format!("unable to walk history of {root}"))?;
            let index = storage.get_or_insert(CommitId::new(oid.clone(), root.clone()))?;
            commits.push((index, oid, commit));
        }

        let everything = PathFilter::everything();
        let mut loaded = LoadedRoot {
            graph_commits: Vec::with_capacity(commits.len()),
            metadata: Vec::with_capacity(commits.len()),
            refs: Vec::with_capacity(tips.len()),
        };
        for (index, oid, commit) in commits {
            let parents = commit
                .parents()
                .iter()
                .filter_map(|parent| storage.index_of(parent, root))
                .collect::<Vec<_>>();
            loaded.graph_commits.push(GraphCommit::new(
                index,
                parents.clone(),
                commit.committer().timestamp().timestamp(),
            ));

            let mut metadata =
                CommitMetadata::from_commit(index, CommitId::new(oid, root.clone()), parents, &commit);
            if with_paths {
                metadata = metadata.with_changed_paths(RepositoryLogProvider::changed_paths(
                    repository,
                    &commit,
                    &everything,
                )?);
            }
            loaded.metadata.push(Arc::new(metadata));
        }

        for (name, oid) in tips {
            match storage.index_of(&oid, root) {
                Some(commit) => loaded.refs.push(VcsRef::new(name, commit, root.clone())),
                None => tracing::warn!(root = %root, branch = %name, "branch tip was not loaded"),
            }
        }

        Ok(loaded)
    }

    pub fn data_pack(&self) -> &Arc<DataPack> {
        &self.data_pack
    }

    pub fn storage(&self) -> &CommitStorage {
        &self.storage
    }

    pub fn top_commits(&self) -> &TopCommitsCache {
        &self.top_commits
    }

    pub fn build(
        &self,
        sort: SortOrder,
        filters: &FilterCollection,
        stage: CommitCountStage,
    ) -> (VisiblePack, CommitCountStage) {
        let filters = self.with_current_user(filters);
        self.builder.build(&self.data_pack, sort, &filters, stage)
    }

    /// Resolve `me` in the user filter for every root
    fn with_current_user(&self, filters: &FilterCollection) -> FilterCollection {
        let (Some(user), Some(current_user)) = (filters.user(), &self.current_user) else {
            return filters.clone();
        };

        let user = self.repositories.keys().fold(user.clone(), |user, root| {
            user.with_current_user(root.clone(), current_user.clone())
        });
        filters.clone().with_user(user)
    }

    /// Full metadata of `index`, read from its repository when not loaded yet
    pub fn details(&self, index: CommitIndex) -> anyhow::Result<Arc<CommitMetadata>> {
        if let Some(metadata) = self
            .top_commits
            .get(index)
            .or_else(|| self.loaded.get(index))
        {
            return Ok(metadata);
        }

        let commit_id = self
            .storage
            .commit_id(index)
            .with_context(|| format!("unknown commit {index}"))?;
        let repository = self
            .repositories
            .get(&commit_id.root)
            .with_context(|| format!("unknown repository root {}", commit_id.root))?;
        let commit = repository
            .database()
            .parse_object_as_commit(&commit_id.hash)?;
        let parents = self.data_pack.permanent_graph().parents(index).to_vec();

        let metadata = Arc::new(CommitMetadata::from_commit(
            index,
            commit_id.clone(),
            parents,
            &commit,
        ));
        self.loaded.insert(Arc::clone(&metadata));
        Ok(metadata)
    }

    /// Full ids of the commits a partial hash resolves to
    pub fn resolve(&self, prefix: &str) -> Vec<CommitId> {
        self.storage
            .resolve_prefix(prefix)
            .into_iter()
            .filter_map(|index| self.storage.commit_id(index).cloned())
            .collect()
    }
}
