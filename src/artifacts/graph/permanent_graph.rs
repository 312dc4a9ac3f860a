//! Permanent commit graph
//!
//! The full DAG of every loaded commit, read-only once built. Commits are kept
//! in *permanent order*: every child precedes all of its parents, and among
//! commits that are free to go first the newest one wins. Ties on timestamp go
//! to the commit discovered first.
//!
//! Filtered views are derived from it with [`PermanentGraph::create_visible_graph`].

use crate::artifacts::graph::commit_id::CommitIndex;
use crate::artifacts::graph::visible_graph::{VisibleGraph, VisibleRow};
use derive_new::new;
use std::cmp::Reverse;
use std::collections::{BinaryHeap, HashMap, HashSet};
use std::sync::OnceLock;

#[derive(Debug, Clone, PartialEq, Eq, new)]
pub struct GraphCommit {
    pub index: CommitIndex,
    pub parents: Vec<CommitIndex>,
    /// Seconds since the epoch
    pub timestamp: i64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, clap::ValueEnum)]
pub enum SortOrder {
    /// Children before parents, otherwise newest first
    #[default]
    Date,
    /// Children before parents, keeping lines of history together
    #[value(name = "topo")]
    Topological,
}

#[derive(Debug, Default)]
pub struct PermanentGraph {
    commits: Vec<GraphCommit>,
    rows: HashMap<CommitIndex, usize>,
    branch_heads: HashSet<CommitIndex>,
    containing_branches: OnceLock<Vec<HashSet<CommitIndex>>>,
}

impl PermanentGraph {
    /// Build the graph, dropping parent links to commits that were not loaded
    pub fn new(
        commits: impl IntoIterator<Item = GraphCommit>,
        branch_heads: impl IntoIterator<Item = CommitIndex>,
    ) -> Self {
        let mut by_index = HashMap::new();
        for commit in commits {
            by_index.entry(commit.index).or_insert(commit);
        }

        for commit in by_index.values().cloned().collect::<Vec<_>>() {
            let known = commit
                .parents
                .iter()
                .copied()
                .filter(|parent| {
                    let present = by_index.contains_key(parent);
                    if !present {
                        tracing::warn!(commit = %commit.index, parent = %parent, "dropping dangling parent");
                    }
                    present
                })
                .collect::<Vec<_>>();
            if let Some(entry) = by_index.get_mut(&commit.index) {
                entry.parents = known;
            }
        }

        let commits = Self::permanent_order(by_index);
        let rows = commits
            .iter()
            .enumerate()
            .map(|(row, commit)| (commit.index, row))
            .collect::<HashMap<_, _>>();
        let branch_heads = branch_heads
            .into_iter()
            .filter(|head| rows.contains_key(head))
            .collect();

        PermanentGraph {
            commits,
            rows,
            branch_heads,
            containing_branches: OnceLock::new(),
        }
    }

    /// Kahn's algorithm over child counts, picking the newest ready commit
    fn permanent_order(by_index: HashMap<CommitIndex, GraphCommit>) -> Vec<GraphCommit> {
        let mut children = HashMap::<CommitIndex, usize>::new();
        for commit in by_index.values() {
            for parent in &commit.parents {
                *children.entry(*parent).or_default() += 1;
            }
        }

        let mut ready = by_index
            .values()
            .filter(|commit| !children.contains_key(&commit.index))
            .map(|commit| (commit.timestamp, Reverse(commit.index)))
            .collect::<BinaryHeap<_>>();

        let mut ordered = Vec::with_capacity(by_index.len());
        let mut emitted = HashSet::with_capacity(by_index.len());
        while let Some((_, Reverse(index))) = ready.pop() {
            let commit = &by_index[&index];
            for parent in &commit.parents {
                if let Some(count) = children.get_mut(parent) {
                    *count -= 1;
                    if *count == 0 {
                        ready.push((by_index[parent].timestamp, Reverse(*parent)));
                    }
                }
            }
            emitted.insert(index);
            ordered.push(commit.clone());
        }

        // only reachable through a parent cycle, which a sane history never has
        if ordered.len() < by_index.len() {
            let mut leftover = by_index
                .values()
                .filter(|commit| !emitted.contains(&commit.index))
                .cloned()
                .collect::<Vec<_>>();
            tracing::warn!(count = leftover.len(), "commit graph contains a cycle");
            leftover.sort_by_key(|commit| (Reverse(commit.timestamp), commit.index));
            ordered.extend(leftover);
        }

        ordered
    }

    /// Every commit in permanent order
    pub fn all_commits(&self) -> &[GraphCommit] {
        &self.commits
    }

    pub fn commit(&self, index: CommitIndex) -> Option<&GraphCommit> {
        self.rows.get(&index).map(|row| &self.commits[*row])
    }

    pub fn parents(&self, index: CommitIndex) -> &[CommitIndex] {
        self.commit(index)
            .map(|commit| commit.parents.as_slice())
            .unwrap_or_default()
    }

    pub fn contains(&self, index: CommitIndex) -> bool {
        self.rows.contains_key(&index)
    }

    pub fn len(&self) -> usize {
        self.commits.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commits.is_empty()
    }

    pub fn branch_heads(&self) -> &HashSet<CommitIndex> {
        &self.branch_heads
    }

    /// Branch heads `index` is reachable from, itself included when it is one
    pub fn containing_branches(&self, index: CommitIndex) -> Option<&HashSet<CommitIndex>> {
        let row = self.rows.get(&index)?;
        let table = self
            .containing_branches
            .get_or_init(|| self.compute_containing_branches());

        Some(&table[*row])
    }

    /// Whether `index` is reachable from at least one of `heads`
    pub fn is_reachable_from_any(&self, index: CommitIndex, heads: &HashSet<CommitIndex>) -> bool {
        self.containing_branches(index)
            .is_some_and(|containing| !containing.is_disjoint(heads))
    }

    // Children come first in permanent order, so one forward pass pushes each
    // head down to all of its ancestors.
    fn compute_containing_branches(&self) -> Vec<HashSet<CommitIndex>> {
        let mut table = vec![HashSet::new(); self.commits.len()];

        for (row, commit) in self.commits.iter().enumerate() {
            if self.branch_heads.contains(&commit.index) {
                table[row].insert(commit.index);
            }
            if table[row].is_empty() {
                continue;
            }

            let inherited = table[row].clone();
            for parent in &commit.parents {
                table[self.rows[parent]].extend(inherited.iter().copied());
            }
        }

        table
    }

    /// Derive the visible graph for a set of heads and a set of commits
    ///
    /// `None` leaves an axis unconstrained. A visible commit's parents are its
    /// nearest visible ancestors, looking through hidden commits.
    pub fn create_visible_graph(
        &self,
        sort: SortOrder,
        heads: Option<&HashSet<CommitIndex>>,
        commits: Option<&HashSet<CommitIndex>>,
    ) -> VisibleGraph {
        let reachable = match heads {
            Some(heads) => self.reachable_rows(heads),
            None => vec![true; self.commits.len()],
        };
        let visible = self
            .commits
            .iter()
            .enumerate()
            .map(|(row, commit)| {
                reachable[row] && commits.is_none_or(|commits| commits.contains(&commit.index))
            })
            .collect::<Vec<_>>();

        // nearest visible commits at or below each row, filled parents first
        let mut frontier: Vec<Option<Vec<CommitIndex>>> = vec![None; self.commits.len()];
        let mut rows = Vec::new();
        for (row, commit) in self.commits.iter().enumerate().rev() {
            if !reachable[row] {
                continue;
            }

            let mut parents = Vec::new();
            for parent in &commit.parents {
                let parent_row = self.rows[parent];
                let nearest = if visible[parent_row] {
                    std::slice::from_ref(parent)
                } else {
                    frontier[parent_row].as_deref().unwrap_or_default()
                };
                for candidate in nearest {
                    if !parents.contains(candidate) {
                        parents.push(*candidate);
                    }
                }
            }

            if visible[row] {
                rows.push(VisibleRow::new(commit.index, parents));
                frontier[row] = Some(vec![commit.index]);
            } else {
                frontier[row] = Some(parents);
            }
        }
        rows.reverse();

        let rows = match sort {
            SortOrder::Date => rows,
            SortOrder::Topological => Self::topological_order(rows),
        };

        VisibleGraph::filtered(rows)
    }

    fn reachable_rows(&self, heads: &HashSet<CommitIndex>) -> Vec<bool> {
        let mut reachable = vec![false; self.commits.len()];
        let mut pending = heads
            .iter()
            .filter_map(|head| self.rows.get(head).copied())
            .collect::<Vec<_>>();

        while let Some(row) = pending.pop() {
            if reachable[row] {
                continue;
            }
            reachable[row] = true;
            pending.extend(
                self.commits[row]
                    .parents
                    .iter()
                    .map(|parent| self.rows[parent])
                    .filter(|parent_row| !reachable[*parent_row]),
            );
        }

        reachable
    }

    /// Depth-first Kahn: follow a line of history until it meets a merge
    fn topological_order(rows: Vec<VisibleRow>) -> Vec<VisibleRow> {
        let mut children = HashMap::<CommitIndex, usize>::new();
        for row in &rows {
            for parent in &row.parents {
                *children.entry(*parent).or_default() += 1;
            }
        }

        let mut by_commit = rows
            .iter()
            .map(|row| (row.commit, row.clone()))
            .collect::<HashMap<_, _>>();
        let mut stack = rows
            .iter()
            .rev()
            .filter(|row| !children.contains_key(&row.commit))
            .map(|row| row.commit)
            .collect::<Vec<_>>();

        let mut ordered = Vec::with_capacity(rows.len());
        while let Some(commit) = stack.pop() {
            let Some(row) = by_commit.remove(&commit) else {
                continue;
            };
            for parent in row.parents.iter().rev() {
                if let Some(count) = children.get_mut(parent) {
                    *count -= 1;
                    if *count == 0 {
                        stack.push(*parent);
                    }
                }
            }
            ordered.push(row);
        }

        ordered
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use proptest::prelude::*;
    use rstest::{fixture, rstest};

    fn idx(raw: u32) -> CommitIndex {
        CommitIndex::new(raw)
    }

    fn commit(index: u32, parents: &[u32], timestamp: i64) -> GraphCommit {
        GraphCommit::new(idx(index), parents.iter().copied().map(idx).collect(), timestamp)
    }

    fn set(raw: &[u32]) -> HashSet<CommitIndex> {
        raw.iter().copied().map(idx).collect()
    }

    fn order(graph: &PermanentGraph) -> Vec<u32> {
        graph
            .all_commits()
            .iter()
            .map(|commit| commit.index.as_usize() as u32)
            .collect()
    }

    fn visible_order(graph: &VisibleGraph) -> Vec<u32> {
        graph
            .rows()
            .iter()
            .map(|row| row.commit.as_usize() as u32)
            .collect()
    }

    /// ```text
    /// 0 (main)    5 (topic)
    /// |           |
    /// 1  merge of 2 and 3
    /// | \         |
    /// 2  3        6
    /// | /         |
    /// 4 ----------'
    /// ```
    #[fixture]
    fn graph() -> PermanentGraph {
        PermanentGraph::new(
            vec![
                commit(0, &[1], 100),
                commit(1, &[2, 3], 90),
                commit(2, &[4], 70),
                commit(3, &[4], 80),
                commit(4, &[], 10),
                commit(5, &[6], 95),
                commit(6, &[4], 50),
            ],
            [idx(0), idx(5)],
        )
    }

    #[rstest]
    fn permanent_order_puts_children_first_then_newest(graph: PermanentGraph) {
        assert_eq!(order(&graph), vec![0, 5, 1, 3, 2, 6, 4]);
    }

    #[rstest]
    fn child_with_older_timestamp_still_precedes_parent() {
        let graph = PermanentGraph::new(vec![commit(0, &[1], 10), commit(1, &[], 20)], [idx(0)]);

        assert_eq!(order(&graph), vec![0, 1]);
    }

    #[rstest]
    fn dangling_parents_are_dropped() {
        let graph = PermanentGraph::new(vec![commit(0, &[7], 10)], [idx(0), idx(9)]);

        assert_eq!(graph.parents(idx(0)), &[] as &[CommitIndex]);
        assert_eq!(graph.branch_heads(), &set(&[0]));
    }

    #[rstest]
    fn containing_branches_follow_reachability(graph: PermanentGraph) {
        assert_eq!(graph.containing_branches(idx(0)), Some(&set(&[0])));
        assert_eq!(graph.containing_branches(idx(3)), Some(&set(&[0])));
        assert_eq!(graph.containing_branches(idx(6)), Some(&set(&[5])));
        assert_eq!(graph.containing_branches(idx(4)), Some(&set(&[0, 5])));
        assert_eq!(graph.containing_branches(idx(42)), None);

        assert!(graph.is_reachable_from_any(idx(2), &set(&[0])));
        assert!(!graph.is_reachable_from_any(idx(2), &set(&[5])));
    }

    #[rstest]
    fn unconstrained_visible_graph_keeps_everything(graph: PermanentGraph) {
        let visible = graph.create_visible_graph(SortOrder::Date, None, None);

        assert_eq!(visible_order(&visible), order(&graph));
        assert_eq!(visible.parents_of(idx(1)), Some(&[idx(2), idx(3)][..]));
    }

    #[rstest]
    fn heads_restrict_to_reachable_commits(graph: PermanentGraph) {
        let visible = graph.create_visible_graph(SortOrder::Date, Some(&set(&[5])), None);

        assert_eq!(visible_order(&visible), vec![5, 6, 4]);
    }

    #[rstest]
    fn hidden_commits_are_bridged_to_nearest_visible_ancestors(graph: PermanentGraph) {
        let visible = graph.create_visible_graph(SortOrder::Date, None, Some(&set(&[0, 4, 5])));

        assert_eq!(visible_order(&visible), vec![0, 5, 4]);
        assert_eq!(visible.parents_of(idx(0)), Some(&[idx(4)][..]));
        assert_eq!(visible.parents_of(idx(5)), Some(&[idx(4)][..]));
        assert_eq!(visible.parents_of(idx(4)), Some(&[][..]));
    }

    #[rstest]
    fn topological_order_keeps_lines_together(graph: PermanentGraph) {
        let visible = graph.create_visible_graph(SortOrder::Topological, None, None);

        assert_eq!(visible_order(&visible), vec![0, 1, 2, 3, 5, 6, 4]);
    }

    fn arbitrary_dag() -> impl Strategy<Value = Vec<GraphCommit>> {
        // parents always have a larger index, which keeps the graph acyclic
        (1usize..24).prop_flat_map(|size| {
            proptest::collection::vec(
                (proptest::collection::vec(any::<u8>(), 0..3), 0i64..1000),
                size,
            )
            .prop_map(move |raw| {
                raw.into_iter()
                    .enumerate()
                    .map(|(index, (parents, timestamp))| {
                        let mut parents = parents
                            .into_iter()
                            .map(|offset| index + 1 + offset as usize % 4)
                            .filter(|parent| *parent < size)
                            .map(|parent| idx(parent as u32))
                            .collect::<Vec<_>>();
                        parents.dedup();
                        GraphCommit::new(idx(index as u32), parents, timestamp)
                    })
                    .collect()
            })
        })
    }

    proptest! {
        #[test]
        fn every_order_puts_children_before_parents(
            commits in arbitrary_dag(),
            keep in proptest::collection::hash_set(0u32..24, 0..24),
            topological in any::<bool>(),
        ) {
            let graph = PermanentGraph::new(commits.clone(), [idx(0)]);
            prop_assert_eq!(graph.len(), commits.len());

            let position = graph
                .all_commits()
                .iter()
                .enumerate()
                .map(|(row, commit)| (commit.index, row))
                .collect::<HashMap<_, _>>();
            for commit in graph.all_commits() {
                for parent in &commit.parents {
                    prop_assert!(position[&commit.index] < position[parent]);
                }
            }

            let sort = if topological { SortOrder::Topological } else { SortOrder::Date };
            let keep = keep.into_iter().map(idx).collect::<HashSet<_>>();
            let visible = graph.create_visible_graph(sort, None, Some(&keep));
            for (row, visible_row) in visible.rows().iter().enumerate() {
                prop_assert!(keep.contains(&visible_row.commit));
                for parent in &visible_row.parents {
                    prop_assert!(visible.row_of(*parent).is_some_and(|parent_row| parent_row > row));
                }
            }
        }
    }
}
