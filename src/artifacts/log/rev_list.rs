use crate::areas::database::Database;
use crate::artifacts::objects::commit::Commit;
use crate::artifacts::objects::object_id::ObjectId;
use std::cmp::Ordering;
use std::collections::{BinaryHeap, HashSet};

/// Commits reachable from a set of tips, newest committer date first
///
/// Every commit is yielded once, however many tips or merges lead to it. A
/// commit that cannot be read is reported as an error and its ancestry is not
/// followed.
pub struct RevList<'r> {
    database: &'r Database,
    queue: BinaryHeap<QueuedCommit>,
    seen: HashSet<ObjectId>,
}

struct QueuedCommit {
    timestamp: i64,
    oid: ObjectId,
    commit: anyhow::Result<Commit>,
}

impl PartialEq for QueuedCommit {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for QueuedCommit {}

impl PartialOrd for QueuedCommit {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for QueuedCommit {
    fn cmp(&self, other: &Self) -> Ordering {
        self.timestamp
            .cmp(&other.timestamp)
            .then_with(|| other.oid.cmp(&self.oid))
    }
}

impl<'r> RevList<'r> {
    pub fn new(database: &'r Database, tips: impl IntoIterator<Item = ObjectId>) -> Self {
        let mut rev_list = RevList {
            database,
            queue: BinaryHeap::new(),
            seen: HashSet::new(),
        };
        for tip in tips {
            rev_list.enqueue(tip);
        }
        rev_list
    }

    fn enqueue(&mut self, oid: ObjectId) {
        if !self.seen.insert(oid.clone()) {
            return;
        }

        let commit = self.database.parse_object_as_commit(&oid);
        let timestamp = commit
            .as_ref()
            .map(|commit| commit.committer().timestamp().timestamp())
            // unreadable commits surface as soon as possible
            .unwrap_or(i64::MAX);
        self.queue.push(QueuedCommit {
            timestamp,
            oid,
            commit,
        });
    }
}

impl Iterator for RevList<'_> {
    type Item = anyhow::Result<(ObjectId, Commit)>;

    fn next(&mut self) -> Option<Self::Item> {
        let QueuedCommit { oid, commit, .. } = self.queue.pop()?;

        match commit {
            Ok(commit) => {
                for parent in commit.parents() {
                    self.enqueue(parent.clone());
                }
                Some(Ok((oid, commit)))
            }
            Err(error) => Some(Err(error.context(format!("Unable to read commit {oid}")))),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifacts::objects::commit::Author;
    use crate::artifacts::objects::tree::Tree;
    use assert_fs::TempDir;
    use pretty_assertions::assert_eq;

    fn commit(database: &Database, parents: &[&ObjectId], timestamp: i64, message: &str) -> ObjectId {
        let tree = database.store(&Tree::default()).unwrap();
        let author = Author::try_from(format!("A <a@x> {timestamp} +0000").as_str()).unwrap();
        let commit = Commit::new(
            parents.iter().map(|parent| (*parent).clone()).collect(),
            tree,
            author,
            message.to_string(),
        );
        database.store(&commit).unwrap()
    }

    fn messages(rev_list: RevList) -> Vec<String> {
        rev_list
            .map(|entry| entry.unwrap().1.short_message().to_string())
            .collect()
    }

    #[test]
    fn walks_merges_newest_first_without_duplicates() {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());

        let base = commit(&database, &[], 100, "base");
        let left = commit(&database, &[&base], 200, "left");
        let right = commit(&database, &[&base], 300, "right");
        let merge = commit(&database, &[&left, &right], 400, "merge");
        let topic = commit(&database, &[&left], 250, "topic");

        let walked = messages(RevList::new(&database, [merge, topic]));

        assert_eq!(walked, vec!["merge", "right", "topic", "left", "base"]);
    }

    #[test]
    fn missing_commit_is_reported() {
        let dir = TempDir::new().unwrap();
        let database = Database::new(dir.path().join("objects").into_boxed_path());
        let missing = ObjectId::try_parse("1".repeat(40)).unwrap();

        let mut rev_list = RevList::new(&database, [missing]);

        assert!(rev_list.next().unwrap().is_err());
        assert!(rev_list.next().is_none());
    }
}
