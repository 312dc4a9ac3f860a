use crate::areas::database::Database;
use crate::areas::refs::Refs;
use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::graph::commit_id::RepositoryRoot;
use anyhow::Context;
use std::path::Path;

/// A working directory with a loose-object `.git` directory
#[derive(Debug)]
pub struct Repository {
    root: RepositoryRoot,
    database: Database,
    refs: Refs,
}

impl Repository {
    /// Open an existing repository at `path`
    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let path = path
            .canonicalize()
            .with_context(|| format!("repository path {} does not exist", path.display()))?;
        let git_path = path.join(".git");

        if !git_path.is_dir() {
            anyhow::bail!("not a git repository: {}", path.display());
        }

        Ok(Repository {
            root: RepositoryRoot::new(path),
            database: Database::new(git_path.join("objects").into_boxed_path()),
            refs: Refs::new(git_path.into_boxed_path()),
        })
    }

    /// Create the `.git` skeleton with HEAD attached to `main`
    pub fn init(path: &Path) -> anyhow::Result<Self> {
        let git_path = path.join(".git");
        for dir in [git_path.join("objects"), git_path.join("refs").join("heads")] {
            std::fs::create_dir_all(&dir)
                .with_context(|| format!("failed to create {}", dir.display()))?;
        }

        let repository = Self::open(path)?;
        repository
            .refs
            .set_head(&BranchName::try_parse("main".to_string())?)?;

        Ok(repository)
    }

    pub fn root(&self) -> &RepositoryRoot {
        &self.root
    }

    pub fn database(&self) -> &Database {
        &self.database
    }

    pub fn refs(&self) -> &Refs {
        &self.refs
    }
}
