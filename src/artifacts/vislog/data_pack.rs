use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::graph::commit_id::{CommitIndex, RepositoryRoot};
use crate::artifacts::graph::permanent_graph::PermanentGraph;
use derive_new::new;
use std::collections::BTreeSet;

/// A branch, or the `HEAD` pseudo-branch, of one repository root
#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct VcsRef {
    pub name: BranchName,
    pub commit: CommitIndex,
    pub root: RepositoryRoot,
}

/// Immutable snapshot of everything loaded for a session
#[derive(Debug, new)]
pub struct DataPack {
    permanent_graph: PermanentGraph,
    refs: Vec<VcsRef>,
    roots: BTreeSet<RepositoryRoot>,
}

impl DataPack {
    pub fn permanent_graph(&self) -> &PermanentGraph {
        &self.permanent_graph
    }

    pub fn branches(&self) -> &[VcsRef] {
        &self.refs
    }

    pub fn roots(&self) -> &BTreeSet<RepositoryRoot> {
        &self.roots
    }

    /// Refs pointing at `commit`, for decorating log output
    pub fn refs_of(&self, commit: CommitIndex) -> impl Iterator<Item = &VcsRef> {
        self.refs.iter().filter(move |vcs_ref| vcs_ref.commit == commit)
    }
}
