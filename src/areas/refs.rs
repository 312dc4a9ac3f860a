//! Git references (branches and HEAD)
//!
//! The log engine only needs the tips it starts walking from:
//!
//! - HEAD: either `ref: refs/heads/<branch>` or a detached commit SHA-1
//! - Branches: `refs/heads/*` loose files, plus entries of `packed-refs`
//!
//! Loose refs take precedence over packed ones with the same name.

use crate::artifacts::branch::branch_name::BranchName;
use crate::artifacts::objects::object_id::ObjectId;
use anyhow::Context;
use derive_new::new;
use file_guard::Lock;
use std::collections::BTreeMap;
use std::io::Write;
use std::ops::DerefMut;
use std::path::Path;
use walkdir::WalkDir;

/// Regex pattern for parsing symbolic references
const SYMREF_REGEX: &str = r"^ref: (.+)$";

/// Prefix of branch refs
pub const HEADS_PREFIX: &str = "refs/heads/";

/// Name of the HEAD reference
pub const HEAD_REF_NAME: &str = "HEAD";

/// References manager rooted at the `.git` directory
#[derive(Debug, new)]
pub struct Refs {
    path: Box<Path>,
}

/// Content of a ref file
#[derive(Debug, Clone, PartialEq, Eq)]
enum SymRefOrOid {
    SymRef(String),
    Oid(ObjectId),
}

impl SymRefOrOid {
    fn read(path: &Path) -> anyhow::Result<Option<SymRefOrOid>> {
        if !path.is_file() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(path)
            .with_context(|| format!("failed to read ref file at {:?}", path))?;
        let content = content.trim();
        if content.is_empty() {
            return Ok(None);
        }

        match regex::Regex::new(SYMREF_REGEX)?.captures(content) {
            Some(symref) => Ok(Some(SymRefOrOid::SymRef(symref[1].to_string()))),
            None => Ok(Some(SymRefOrOid::Oid(ObjectId::try_parse(
                content.to_string(),
            )?))),
        }
    }
}

impl Refs {
    /// Commit HEAD points to, following symbolic refs
    ///
    /// `None` for an unborn branch.
    pub fn read_head(&self) -> anyhow::Result<Option<ObjectId>> {
        self.resolve(HEAD_REF_NAME, 0)
    }

    fn resolve(&self, ref_name: &str, depth: usize) -> anyhow::Result<Option<ObjectId>> {
        if depth > 8 {
            anyhow::bail!("symbolic ref loop at {ref_name}");
        }

        match SymRefOrOid::read(&self.path.join(ref_name))? {
            Some(SymRefOrOid::SymRef(target)) => self.resolve(&target, depth + 1),
            Some(SymRefOrOid::Oid(oid)) => Ok(Some(oid)),
            None => Ok(self.read_packed_refs()?.remove(ref_name)),
        }
    }

    /// All branches with the commit they point to, sorted by name
    pub fn list_branches(&self) -> anyhow::Result<Vec<(BranchName, ObjectId)>> {
        let mut branches = BTreeMap::new();

        for (ref_name, oid) in self.read_packed_refs()? {
            if let Some(name) = ref_name.strip_prefix(HEADS_PREFIX) {
                branches.insert(name.to_string(), oid);
            }
        }

        let heads_path = self.heads_path();
        for entry in WalkDir::new(&heads_path)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
        {
            let name = entry
                .path()
                .strip_prefix(&heads_path)?
                .components()
                .map(|component| component.as_os_str().to_string_lossy())
                .collect::<Vec<_>>()
                .join("/");

            match SymRefOrOid::read(entry.path())? {
                Some(SymRefOrOid::Oid(oid)) => {
                    branches.insert(name, oid);
                }
                Some(SymRefOrOid::SymRef(target)) => {
                    if let Some(oid) = self.resolve(&target, 1)? {
                        branches.insert(name, oid);
                    }
                }
                None => {}
            }
        }

        branches
            .into_iter()
            .map(|(name, oid)| Ok((BranchName::try_parse(name)?, oid)))
            .collect()
    }

    fn read_packed_refs(&self) -> anyhow::Result<BTreeMap<String, ObjectId>> {
        let path = self.path.join("packed-refs");
        if !path.is_file() {
            return Ok(BTreeMap::new());
        }

        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("failed to read packed refs at {:?}", path))?;

        // '#' starts the header, '^' lines peel annotated tags
        content
            .lines()
            .filter(|line| !line.starts_with('#') && !line.starts_with('^'))
            .filter_map(|line| line.split_once(' '))
            .map(|(oid, name)| Ok((name.trim().to_string(), ObjectId::try_parse(oid.to_string())?)))
            .collect()
    }

    /// Point a branch at a commit, creating it when missing
    pub fn update_branch(&self, name: &BranchName, oid: &ObjectId) -> anyhow::Result<()> {
        self.update_ref_file(&self.heads_path().join(name.as_ref()), oid.as_ref())
    }

    /// Attach HEAD to a branch
    pub fn set_head(&self, name: &BranchName) -> anyhow::Result<()> {
        self.update_ref_file(&self.head_path(), &format!("ref: {HEADS_PREFIX}{name}"))
    }

    fn update_ref_file(&self, path: &Path, raw_ref: &str) -> anyhow::Result<()> {
        std::fs::create_dir_all(path.parent().with_context(|| {
            format!("failed to create parent directories for ref file at {:?}", path)
        })?)?;

        let mut ref_file = std::fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)
            .with_context(|| format!("failed to open ref file at {:?}", path))?;
        let mut lock = file_guard::lock(&mut ref_file, Lock::Exclusive, 0, 1)?;
        lock.deref_mut().write_all(raw_ref.as_bytes())?;
        lock.deref_mut().write_all(b"\n")?;

        Ok(())
    }

    pub fn head_path(&self) -> Box<Path> {
        self.path.join(HEAD_REF_NAME).into_boxed_path()
    }

    pub fn heads_path(&self) -> Box<Path> {
        self.path.join("refs").join("heads").into_boxed_path()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    fn branch(name: &str) -> BranchName {
        BranchName::try_parse(name.to_string()).unwrap()
    }

    #[fixture]
    fn git_dir() -> TempDir {
        TempDir::new().expect("Failed to create temp dir")
    }

    #[rstest]
    fn head_follows_attached_branch(git_dir: TempDir) {
        let refs = Refs::new(git_dir.path().into());
        refs.update_branch(&branch("main"), &oid('a')).unwrap();
        refs.set_head(&branch("main")).unwrap();

        assert_eq!(refs.read_head().unwrap(), Some(oid('a')));
    }

    #[rstest]
    fn unborn_head_resolves_to_none(git_dir: TempDir) {
        let refs = Refs::new(git_dir.path().into());
        refs.set_head(&branch("main")).unwrap();

        assert_eq!(refs.read_head().unwrap(), None);
    }

    #[rstest]
    fn list_branches_merges_loose_and_packed_refs(git_dir: TempDir) {
        std::fs::write(
            git_dir.path().join("packed-refs"),
            format!(
                "# pack-refs with: peeled\n{} refs/heads/main\n{} refs/heads/old\n{} refs/tags/v1\n",
                oid('1'),
                oid('2'),
                oid('3')
            ),
        )
        .unwrap();
        let refs = Refs::new(git_dir.path().into());
        refs.update_branch(&branch("main"), &oid('4')).unwrap();
        refs.update_branch(&branch("feature/login"), &oid('5')).unwrap();

        assert_eq!(
            refs.list_branches().unwrap(),
            vec![
                (branch("feature/login"), oid('5')),
                (branch("main"), oid('4')),
                (branch("old"), oid('2')),
            ]
        );
    }
}
