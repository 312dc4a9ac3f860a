use crate::artifacts::graph::commit_id::CommitIndex;
use derive_new::new;
use std::collections::HashMap;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct VisibleRow {
    pub commit: CommitIndex,
    /// Nearest visible ancestors, in parent order
    pub parents: Vec<CommitIndex>,
}

/// Ordered rows of the commits that survived filtering
///
/// `Empty` is the definitive "nothing can match" answer and is distinct from
/// a filtered graph that merely ended up with no rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum VisibleGraph {
    Empty,
    Filtered {
        rows: Vec<VisibleRow>,
        positions: HashMap<CommitIndex, usize>,
    },
}

impl VisibleGraph {
    pub fn filtered(rows: Vec<VisibleRow>) -> Self {
        let positions = rows
            .iter()
            .enumerate()
            .map(|(position, row)| (row.commit, position))
            .collect();

        VisibleGraph::Filtered { rows, positions }
    }

    pub fn is_definitely_empty(&self) -> bool {
        matches!(self, VisibleGraph::Empty)
    }

    pub fn rows(&self) -> &[VisibleRow] {
        match self {
            VisibleGraph::Empty => &[],
            VisibleGraph::Filtered { rows, .. } => rows,
        }
    }

    pub fn len(&self) -> usize {
        self.rows().len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows().is_empty()
    }

    pub fn row_of(&self, commit: CommitIndex) -> Option<usize> {
        match self {
            VisibleGraph::Empty => None,
            VisibleGraph::Filtered { positions, .. } => positions.get(&commit).copied(),
        }
    }

    pub fn commit_at(&self, row: usize) -> Option<CommitIndex> {
        self.rows().get(row).map(|row| row.commit)
    }

    pub fn parents_of(&self, commit: CommitIndex) -> Option<&[CommitIndex]> {
        self.row_of(commit)
            .map(|row| self.rows()[row].parents.as_slice())
    }

    /// Visible commits in row order
    pub fn commits(&self) -> impl Iterator<Item = CommitIndex> + '_ {
        self.rows().iter().map(|row| row.commit)
    }
}
