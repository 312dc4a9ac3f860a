//! Commit metadata and the ways to reach it
//!
//! - [`CommitMetadata`]: immutable details of one commit, shared as `Arc`
//! - [`CommitDataGetter`]: "give me the metadata if it is already loaded"
//! - [`MetadataStore`]: plain in-memory getter filled by a session
//! - [`OwnerThreadGetter`]: serves reads from the single thread that owns the
//!   metadata source; other threads rendezvous with it over channels

use crate::artifacts::graph::commit_id::{CommitId, CommitIndex, RepositoryRoot};
use crate::artifacts::objects::commit::{Author, Commit};
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::{Arc, PoisonError, RwLock};
use std::thread::{JoinHandle, ThreadId};
use tokio::sync::{mpsc, oneshot};

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct CommitMetadata {
    pub index: CommitIndex,
    pub hash: ObjectId,
    pub root: RepositoryRoot,
    pub parents: Vec<CommitIndex>,
    pub author: Author,
    /// Committer timestamp, the key the permanent graph is ordered by
    pub committed_at: i64,
    pub message: String,
    /// Paths relative to the root, only known once full details are loaded
    #[new(default)]
    pub changed_paths: Option<Vec<PathBuf>>,
}

impl CommitMetadata {
    pub fn from_commit(
        index: CommitIndex,
        commit_id: CommitId,
        parents: Vec<CommitIndex>,
        commit: &Commit,
    ) -> Self {
        CommitMetadata::new(
            index,
            commit_id.hash,
            commit_id.root,
            parents,
            commit.author().clone(),
            commit.committer().timestamp().timestamp(),
            commit.message().to_string(),
        )
    }

    pub fn with_changed_paths(mut self, changed_paths: Vec<PathBuf>) -> Self {
        self.changed_paths = Some(changed_paths);
        self
    }

    pub fn commit_id(&self) -> CommitId {
        CommitId::new(self.hash.clone(), self.root.clone())
    }

    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }
}

pub trait CommitDataGetter: Send + Sync {
    /// Metadata already in memory, `None` when it would have to be loaded
    fn commit_data_if_available(&self, index: CommitIndex) -> Option<Arc<CommitMetadata>>;
}

/// Metadata loaded so far, filled as details are read
#[derive(Debug, Default)]
pub struct MetadataStore {
    entries: RwLock<HashMap<CommitIndex, Arc<CommitMetadata>>>,
}

impl MetadataStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&self, metadata: Arc<CommitMetadata>) {
        self.entries
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .insert(metadata.index, metadata);
    }

    pub fn get(&self, index: CommitIndex) -> Option<Arc<CommitMetadata>> {
        self.entries
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(&index)
            .cloned()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl CommitDataGetter for MetadataStore {
    fn commit_data_if_available(&self, index: CommitIndex) -> Option<Arc<CommitMetadata>> {
        self.get(index)
    }
}

type MetadataRequest = (CommitIndex, oneshot::Sender<Option<Arc<CommitMetadata>>>);

/// Name of the thread owning the metadata source
pub const OWNER_THREAD_NAME: &str = "vislog-metadata";

/// Bounded so that a stalled owner applies backpressure instead of piling up
const REQUEST_QUEUE_SIZE: usize = 64;

pub struct OwnerThreadGetter {
    source: Arc<dyn CommitDataGetter>,
    requests: Option<mpsc::Sender<MetadataRequest>>,
    owner: Option<JoinHandle<()>>,
    owner_id: ThreadId,
}

impl OwnerThreadGetter {
    pub fn spawn(source: Arc<dyn CommitDataGetter>) -> anyhow::Result<Self> {
        let (requests, mut incoming) = mpsc::channel::<MetadataRequest>(REQUEST_QUEUE_SIZE);
        let owned = Arc::clone(&source);

        let owner = std::thread::Builder::new()
            .name(OWNER_THREAD_NAME.to_string())
            .spawn(move || {
                while let Some((index, reply)) = incoming.blocking_recv() {
                    // the caller may have given up waiting
                    let _ = reply.send(owned.commit_data_if_available(index));
                }
                tracing::trace!("metadata owner thread stopped");
            })
            .context("Unable to spawn metadata owner thread")?;

        Ok(OwnerThreadGetter {
            source,
            requests: Some(requests),
            owner_id: owner.thread().id(),
            owner: Some(owner),
        })
    }
}

impl CommitDataGetter for OwnerThreadGetter {
    fn commit_data_if_available(&self, index: CommitIndex) -> Option<Arc<CommitMetadata>> {
        if std::thread::current().id() == self.owner_id {
            return self.source.commit_data_if_available(index);
        }

        let requests = self.requests.as_ref()?;
        let (reply, response) = oneshot::channel();
        if requests.blocking_send((index, reply)).is_err() {
            tracing::warn!(commit = %index, "metadata owner thread is gone");
            return None;
        }

        response.blocking_recv().ok().flatten()
    }
}

impl Drop for OwnerThreadGetter {
    fn drop(&mut self) {
        // closing the channel ends the owner loop
        self.requests.take();
        if let Some(owner) = self.owner.take()
            && owner.join().is_err()
        {
            tracing::error!("metadata owner thread panicked");
        }
    }
}

impl std::fmt::Debug for OwnerThreadGetter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OwnerThreadGetter")
            .field("owner_id", &self.owner_id)
            .finish_non_exhaustive()
    }
}
