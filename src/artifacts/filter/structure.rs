//! Root and structure (path) filters
//!
//! Structure paths are absolute. A path can sit inside a root, be the root
//! itself, or be an ancestor of it; the last two select the whole root.

use crate::artifacts::filter::{DetailsFilter, FilterKind};
use crate::artifacts::graph::commit_id::RepositoryRoot;
use crate::artifacts::vislog::metadata::CommitMetadata;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RootFilter {
    roots: BTreeSet<RepositoryRoot>,
}

impl RootFilter {
    pub fn new(roots: impl IntoIterator<Item = RepositoryRoot>) -> Self {
        RootFilter {
            roots: roots.into_iter().collect(),
        }
    }

    pub fn contains(&self, root: &RepositoryRoot) -> bool {
        self.roots.contains(root)
    }

    pub fn roots(&self) -> impl Iterator<Item = &RepositoryRoot> {
        self.roots.iter()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StructureFilter {
    paths: BTreeSet<PathBuf>,
}

impl StructureFilter {
    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        StructureFilter {
            paths: paths.into_iter().collect(),
        }
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.paths.iter().map(PathBuf::as_path)
    }

    /// Filtered paths relative to `root`
    ///
    /// An empty relative path stands for the whole root. Empty when no path
    /// touches the root.
    pub fn files_for_root(&self, root: &RepositoryRoot) -> Vec<PathBuf> {
        let mut files = BTreeSet::new();

        for path in &self.paths {
            if root.path().starts_with(path) {
                return vec![PathBuf::new()];
            }
            if let Ok(relative) = path.strip_prefix(root.path()) {
                files.insert(relative.to_path_buf());
            }
        }

        files.into_iter().collect()
    }

    pub fn touches_root(&self, root: &RepositoryRoot) -> bool {
        self.paths
            .iter()
            .any(|path| path.starts_with(root.path()) || root.path().starts_with(path))
    }

    /// The same filter narrowed to the paths that touch `root`
    pub fn for_root(&self, root: &RepositoryRoot) -> Self {
        StructureFilter::new(
            self.files_for_root(root)
                .into_iter()
                .map(|relative| root.path().join(relative)),
        )
    }
}

impl DetailsFilter for StructureFilter {
    fn kind(&self) -> FilterKind {
        FilterKind::STRUCTURE
    }

    fn matches(&self, metadata: &CommitMetadata) -> bool {
        let Some(changed_paths) = &metadata.changed_paths else {
            return false;
        };

        let files = self.files_for_root(&metadata.root);
        changed_paths
            .iter()
            .any(|changed| files.iter().any(|file| changed.starts_with(file)))
    }
}

/// Roots passing the root filter and touched by the structure filter
pub fn visible_roots<'r>(
    all_roots: impl IntoIterator<Item = &'r RepositoryRoot>,
    root_filter: Option<&RootFilter>,
    structure_filter: Option<&StructureFilter>,
) -> BTreeSet<RepositoryRoot> {
    all_roots
        .into_iter()
        .filter(|root| root_filter.is_none_or(|filter| filter.contains(root)))
        .filter(|root| structure_filter.is_none_or(|filter| filter.touches_root(root)))
        .cloned()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::vislog::metadata::tests::metadata;
    use pretty_assertions::assert_eq;
    use rstest::rstest;

    fn root(path: &str) -> RepositoryRoot {
        RepositoryRoot::new(path)
    }

    #[rstest]
    #[case(vec!["/work/app/src/main.rs"], vec!["src/main.rs"])]
    #[case(vec!["/work/app/src", "/work/app/docs"], vec!["docs", "src"])]
    #[case(vec!["/work/app"], vec![""])]
    #[case(vec!["/work", "/work/app/src"], vec![""])]
    #[case(vec!["/work/lib/src"], vec![])]
    #[case(vec!["/work/application"], vec![])]
    fn files_for_root_are_relative(#[case] paths: Vec<&str>, #[case] expected: Vec<&str>) {
        let filter = StructureFilter::new(paths.into_iter().map(PathBuf::from));

        assert_eq!(
            filter.files_for_root(&root("/work/app")),
            expected.into_iter().map(PathBuf::from).collect::<Vec<_>>()
        );
    }

    #[test]
    fn visible_roots_apply_both_filters() {
        let roots = [root("/work/app"), root("/work/lib"), root("/other/tool")];
        let structure = StructureFilter::new([PathBuf::from("/work")]);
        let root_filter = RootFilter::new([root("/work/lib"), root("/other/tool")]);

        assert_eq!(
            visible_roots(&roots, None, None),
            roots.iter().cloned().collect::<BTreeSet<_>>()
        );
        assert_eq!(
            visible_roots(&roots, None, Some(&structure)),
            BTreeSet::from([root("/work/app"), root("/work/lib")])
        );
        assert_eq!(
            visible_roots(&roots, Some(&root_filter), Some(&structure)),
            BTreeSet::from([root("/work/lib")])
        );
    }

    #[test]
    fn structure_matches_only_known_changed_paths() {
        let filter = StructureFilter::new([PathBuf::from("/repo/src")]);
        let plain = metadata(0, "Ada", "message");

        assert!(!filter.matches(&plain));
        assert!(filter.matches(
            &plain
                .clone()
                .with_changed_paths(vec![PathBuf::from("src/lib.rs")])
        ));
        assert!(!filter.matches(&plain.with_changed_paths(vec![PathBuf::from("srcs/lib.rs")])));
    }

    #[test]
    fn for_root_keeps_absolute_paths_of_that_root() {
        let filter = StructureFilter::new([PathBuf::from("/a/x.txt"), PathBuf::from("/b/y.txt")]);

        assert_eq!(
            filter.for_root(&root("/a")),
            StructureFilter::new([PathBuf::from("/a/x.txt")])
        );
    }
}
