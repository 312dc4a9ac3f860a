use crate::areas::database::Database;
use crate::artifacts::log::path_filter::PathFilter;
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::tree::{Tree, TreeEntry};
use std::collections::BTreeSet;
use std::path::PathBuf;

/// Paths of the files that differ between two trees
///
/// Only subtrees the [`PathFilter`] allows are read, so narrow filters keep
/// the walk close to the touched paths.
#[derive(Debug)]
pub struct TreeDiff<'r> {
    database: &'r Database,
    changed: BTreeSet<PathBuf>,
}

impl<'r> TreeDiff<'r> {
    pub fn new(database: &'r Database) -> Self {
        TreeDiff {
            database,
            changed: BTreeSet::new(),
        }
    }

    /// Changed file paths between `old` and `new`, `None` standing for an empty tree
    pub fn changed_paths(
        mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        filter: &PathFilter,
    ) -> anyhow::Result<Vec<PathBuf>> {
        self.compare_trees(old, new, filter)?;
        Ok(self.changed.into_iter().collect())
    }

    fn compare_trees(
        &mut self,
        old: Option<&ObjectId>,
        new: Option<&ObjectId>,
        filter: &PathFilter,
    ) -> anyhow::Result<()> {
        if old == new {
            return Ok(());
        }

        let old_tree = self.load_tree(old)?;
        let new_tree = self.load_tree(new)?;

        let names = filter
            .filter_matching_entries(old_tree.entries().chain(new_tree.entries()))
            .map(|(name, _)| name.clone())
            .collect::<BTreeSet<_>>();

        for name in names {
            let old_entry = old_tree.get(&name);
            let new_entry = new_tree.get(&name);
            if old_entry == new_entry {
                continue;
            }

            let subpath_filter = filter.subpath_filter(&name);
            let old_subtree = old_entry.filter(|entry| entry.is_tree()).map(|entry| &entry.oid);
            let new_subtree = new_entry.filter(|entry| entry.is_tree()).map(|entry| &entry.oid);
            if old_subtree.is_some() || new_subtree.is_some() {
                self.compare_trees(old_subtree, new_subtree, &subpath_filter)?;
            }

            let old_file = old_entry.filter(|entry| !entry.is_tree());
            let new_file = new_entry.filter(|entry| !entry.is_tree());
            if Self::file_changed(old_file, new_file) && subpath_filter.is_matching() {
                self.changed.insert(subpath_filter.path().to_path_buf());
            }
        }

        Ok(())
    }

    fn file_changed(old: Option<&TreeEntry>, new: Option<&TreeEntry>) -> bool {
        match (old, new) {
            (None, None) => false,
            (Some(old), Some(new)) => old != new,
            _ => true,
        }
    }

    fn load_tree(&self, oid: Option<&ObjectId>) -> anyhow::Result<Tree> {
        match oid {
            None => Ok(Tree::default()),
            Some(oid) => self.database.parse_object_as_tree(oid),
        }
    }
}
