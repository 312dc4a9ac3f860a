use std::collections::HashMap;
use std::hash::Hash;
use std::path::{Path, PathBuf};

/// Restricts a tree walk to the subtrees named by a set of relative paths
///
/// An empty path selects everything below the current level.
#[derive(Debug, Clone)]
pub struct PathFilter {
    path_trie: Trie<String>,
    root_path: PathBuf,
}

impl PathFilter {
    /// Filter letting every path through
    pub fn everything() -> Self {
        Self {
            path_trie: Trie::with_matching(true),
            root_path: PathBuf::new(),
        }
    }

    pub fn new(paths: impl IntoIterator<Item = PathBuf>) -> Self {
        let mut trie = Trie::new();
        for path in paths {
            let components = path
                .components()
                .map(|component| component.as_os_str().to_string_lossy().to_string())
                .collect::<Vec<_>>();
            trie.insert(&components);
        }

        Self {
            path_trie: trie,
            root_path: PathBuf::new(),
        }
    }

    /// Path of the level this filter was narrowed to
    pub fn path(&self) -> &Path {
        &self.root_path
    }

    /// Whether everything at and below this level is selected
    pub fn is_matching(&self) -> bool {
        self.path_trie.is_matching
    }

    /// Whether `name` at this level is selected or leads to a selected path
    pub fn allows(&self, name: &str) -> bool {
        self.path_trie.contains_single(name)
    }

    pub fn filter_matching_entries<'e, Entry: 'e>(
        &self,
        entries: impl Iterator<Item = (&'e String, &'e Entry)>,
    ) -> impl Iterator<Item = (&'e String, &'e Entry)> {
        entries.filter(move |(name, _)| self.allows(name))
    }

    /// Narrow the filter to the entry `name` of the current level
    pub fn subpath_filter(&self, name: &str) -> Self {
        Self {
            path_trie: if self.path_trie.is_matching {
                self.path_trie.clone()
            } else {
                self.path_trie
                    .children
                    .get(name)
                    .cloned()
                    .unwrap_or_else(Trie::new)
            },
            root_path: self.root_path.join(name),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Trie<T: Hash + Eq + Clone> {
    is_matching: bool,
    children: HashMap<T, Trie<T>>,
}

impl<T: Hash + Eq + Clone> Default for Trie<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Hash + Eq + Clone> Trie<T> {
    pub fn new() -> Self {
        Self::with_matching(false)
    }

    pub fn with_matching(is_matching: bool) -> Self {
        Trie {
            is_matching,
            children: HashMap::new(),
        }
    }

    pub fn insert(&mut self, path: &[T]) {
        let mut node = self;
        for part in path {
            // anything below an already selected path is selected too
            if node.is_matching {
                return;
            }
            node = node.children.entry(part.clone()).or_default();
        }
        node.is_matching = true;
        node.children.clear();
    }

    pub fn contains(&self, path: &[T]) -> bool {
        let mut node = self;
        for part in path {
            if node.is_matching {
                return true;
            }
            match node.children.get(part) {
                Some(child) => node = child,
                None => return false,
            }
        }
        node.is_matching
    }

    pub fn contains_single<Q>(&self, part: &Q) -> bool
    where
        T: std::borrow::Borrow<Q>,
        Q: Hash + Eq + ?Sized,
    {
        self.is_matching || self.children.contains_key(part)
    }
}
