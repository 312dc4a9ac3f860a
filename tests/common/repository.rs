use assert_fs::TempDir;
use bytes::Bytes;
use rstest::fixture;
use std::collections::{BTreeMap, HashMap};
use std::path::Path;
use vislog::areas::database::Database;
use vislog::areas::repository::Repository;
use vislog::artifacts::branch::branch_name::BranchName;
use vislog::artifacts::objects::blob::Blob;
use vislog::artifacts::objects::commit::{Author, Commit};
use vislog::artifacts::objects::object_id::ObjectId;
use vislog::artifacts::objects::tree::{EntryMode, Tree, TreeEntry};

pub const T0: i64 = 1_700_000_000;

/// Writes loose-object history straight into a scratch repository
pub struct RepositoryWriter {
    dir: TempDir,
    repository: Repository,
    branch: String,
    files: HashMap<String, BTreeMap<String, String>>,
}

impl RepositoryWriter {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let repository = Repository::init(dir.path()).expect("Failed to init repository");
        RepositoryWriter {
            dir,
            repository,
            branch: "main".to_string(),
            files: HashMap::new(),
        }
    }

    pub fn path(&self) -> &Path {
        self.repository.root().path()
    }

    pub fn commit(
        &mut self,
        author: &str,
        timestamp: i64,
        message: &str,
        files: &[(&str, &str)],
    ) -> ObjectId {
        let state = self.files.entry(self.branch.clone()).or_default();
        for (path, content) in files {
            state.insert(path.to_string(), content.to_string());
        }
        let database = self.repository.database();
        let tree = store_tree(database, state);

        let author = Author::try_from(
            format!("{author} <{}@example.com> {timestamp} +0000", author.to_lowercase()).as_str(),
        )
        .expect("Invalid author");
        let parents = self
            .repository
            .refs()
            .read_head()
            .expect("Unreadable HEAD")
            .into_iter()
            .collect();
        let oid = database
            .store(&Commit::new(parents, tree, author, message.to_string()))
            .expect("Failed to store commit");

        let branch = BranchName::try_parse(self.branch.clone()).expect("Invalid branch");
        self.repository
            .refs()
            .update_branch(&branch, &oid)
            .expect("Failed to update branch");
        oid
    }

    /// Create `name` at the current tip and switch to it
    pub fn branch_off(&mut self, name: &str) {
        let head = self
            .repository
            .refs()
            .read_head()
            .expect("Unreadable HEAD")
            .expect("No commits yet");
        let branch = BranchName::try_parse(name.to_string()).expect("Invalid branch");
        self.repository
            .refs()
            .update_branch(&branch, &head)
            .expect("Failed to create branch");

        let state = self.files.get(&self.branch).cloned().unwrap_or_default();
        self.files.insert(name.to_string(), state);
        self.switch(name);
    }

    pub fn switch(&mut self, name: &str) {
        let branch = BranchName::try_parse(name.to_string()).expect("Invalid branch");
        self.repository.refs().set_head(&branch).expect("Failed to set HEAD");
        self.branch = name.to_string();
    }

    pub fn temp_dir(&self) -> &TempDir {
        &self.dir
    }
}

fn store_tree(database: &Database, files: &BTreeMap<String, String>) -> ObjectId {
    let mut tree = Tree::default();
    let mut subdirs = BTreeMap::<String, BTreeMap<String, String>>::new();

    for (path, content) in files {
        match path.split_once('/') {
            Some((dir, rest)) => {
                subdirs
                    .entry(dir.to_string())
                    .or_default()
                    .insert(rest.to_string(), content.clone());
            }
            None => {
                let oid = database
                    .store(&Blob::new(Bytes::from(content.clone())))
                    .expect("Failed to store blob");
                tree.insert(path.clone(), TreeEntry::new(oid, EntryMode::Regular));
            }
        }
    }
    for (dir, nested) in subdirs {
        let oid = store_tree(database, &nested);
        tree.insert(dir, TreeEntry::new(oid, EntryMode::Directory));
    }

    database.store(&tree).expect("Failed to store tree")
}

pub struct Project {
    pub writer: RepositoryWriter,
    /// Newest last
    pub commits: Vec<ObjectId>,
}

/// ```text
/// main:  Initial commit (Ada) - Add parser (Linus) - Fix parser crash (Grace)
///                                    \
/// topic:                              Document parser (Ada)
/// ```
#[fixture]
pub fn project() -> Project {
    let mut writer = RepositoryWriter::new();
    let c0 = writer.commit("Ada", T0, "Initial commit", &[("README", "hello")]);
    let c1 = writer.commit("Linus", T0 + 100, "Add parser", &[("src/parser.rs", "fn parse() {}")]);
    writer.branch_off("topic");
    let c2 = writer.commit(
        "Ada",
        T0 + 200,
        "Document parser",
        &[("docs/parser.md", "# Parser")],
    );
    writer.switch("main");
    let c3 = writer.commit(
        "Grace",
        T0 + 300,
        "Fix parser crash",
        &[("src/parser.rs", "fn parse() { /* fixed */ }")],
    );

    Project {
        writer,
        commits: vec![c0, c1, c2, c3],
    }
}
