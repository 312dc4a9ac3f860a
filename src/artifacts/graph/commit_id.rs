use crate::artifacts::objects::object_id::ObjectId;
use derive_new::new;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Canonical path of a repository working directory
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct RepositoryRoot(Arc<Path>);

impl RepositoryRoot {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self(Arc::from(path.into().into_boxed_path()))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }

    /// Last path component, used to label commits in multi-root output
    pub fn name(&self) -> String {
        self.0
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_else(|| self.0.display().to_string())
    }
}

impl AsRef<Path> for RepositoryRoot {
    fn as_ref(&self) -> &Path {
        &self.0
    }
}

impl std::fmt::Display for RepositoryRoot {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

/// A commit is only unique together with the repository it lives in
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, new)]
pub struct CommitId {
    pub hash: ObjectId,
    pub root: RepositoryRoot,
}

/// Dense surrogate key for a [`CommitId`], stable for a session
///
/// A session holds at most `u32::MAX + 1` commits; storage refuses more.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CommitIndex(u32);

impl CommitIndex {
    pub const fn new(index: u32) -> Self {
        Self(index)
    }

    pub fn as_usize(&self) -> usize {
        self.0 as usize
    }
}

impl std::fmt::Display for CommitIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}
