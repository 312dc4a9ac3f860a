//! Git commit object
//!
//! ## Format
//!
//! ```text
//! tree <tree-sha>
//! parent <parent-sha>            (zero or more)
//! author <name> <email> <timestamp> <timezone>
//! committer <name> <email> <timestamp> <timezone>
//! [other headers, continuation lines start with a space]
//!
//! <commit message>
//! ```

use crate::artifacts::objects::object::{Object, Packable, Unpackable};
use crate::artifacts::objects::object_id::ObjectId;
use crate::artifacts::objects::object_type::ObjectType;
use anyhow::Context;
use bytes::Bytes;
use chrono::{DateTime, FixedOffset};
use std::io::{BufRead, Read};

/// Author or committer identity with a timezone-aware timestamp
#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Author {
    name: String,
    email: String,
    timestamp: DateTime<FixedOffset>,
}

impl Author {
    pub fn new(name: String, email: String, timestamp: DateTime<FixedOffset>) -> Self {
        Author {
            name,
            email,
            timestamp,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn email(&self) -> &str {
        &self.email
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.timestamp
    }

    /// "Name <email@example.com>"
    pub fn display_name(&self) -> String {
        format!("{} <{}>", self.name, self.email)
    }

    /// Header form: "Name <email> 1700000000 +0200"
    pub fn display(&self) -> String {
        format!(
            "{} <{}> {} {}",
            self.name,
            self.email,
            self.timestamp.timestamp(),
            self.timestamp.format("%z")
        )
    }

    /// "Mon Jan 1 12:34:56 2024 +0000"
    pub fn readable_timestamp(&self) -> String {
        self.timestamp
            .format("%a %b %-d %H:%M:%S %Y %z")
            .to_string()
    }
}

impl TryFrom<&str> for Author {
    type Error = anyhow::Error;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        // Split from the right: the name itself may contain spaces
        let parts: Vec<&str> = value.rsplitn(3, ' ').collect();
        let &[timezone, timestamp, name_email] = parts.as_slice() else {
            anyhow::bail!("Invalid author format: {value}");
        };

        let timestamp = timestamp
            .parse::<i64>()
            .map_err(|_| anyhow::anyhow!("Invalid timestamp: {timestamp}"))?;
        let offset = chrono::DateTime::parse_from_str(
            &format!("1970-01-01 00:00:00 {timezone}"),
            "%Y-%m-%d %H:%M:%S %z",
        )
        .map_err(|_| anyhow::anyhow!("Invalid timezone: {timezone}"))?
        .offset()
        .to_owned();

        let email_start = name_email
            .find('<')
            .context("Invalid author format: missing '<'")?;
        let email_end = name_email
            .rfind('>')
            .context("Invalid author format: missing '>'")?;
        if email_end < email_start {
            anyhow::bail!("Invalid author format: {value}");
        }

        let datetime = DateTime::from_timestamp(timestamp, 0)
            .context("Invalid timestamp")?
            .with_timezone(&offset);

        Ok(Author {
            name: name_email[..email_start].trim().to_string(),
            email: name_email[email_start + 1..email_end].to_string(),
            timestamp: datetime,
        })
    }
}

#[derive(Debug, Clone, Eq, PartialEq)]
pub struct Commit {
    /// Empty for root commits, several for merges
    parents: Vec<ObjectId>,
    tree_oid: ObjectId,
    author: Author,
    committer: Author,
    message: String,
}

impl Commit {
    /// Create a commit whose committer is its author
    pub fn new(parents: Vec<ObjectId>, tree_oid: ObjectId, author: Author, message: String) -> Self {
        Commit {
            parents,
            tree_oid,
            committer: author.clone(),
            author,
            message,
        }
    }

    /// First line of the message
    pub fn short_message(&self) -> &str {
        self.message.lines().next().unwrap_or("")
    }

    pub fn message(&self) -> &str {
        &self.message
    }

    pub fn tree_oid(&self) -> &ObjectId {
        &self.tree_oid
    }

    pub fn parents(&self) -> &[ObjectId] {
        &self.parents
    }

    pub fn first_parent(&self) -> Option<&ObjectId> {
        self.parents.first()
    }

    pub fn author(&self) -> &Author {
        &self.author
    }

    pub fn committer(&self) -> &Author {
        &self.committer
    }

    pub fn timestamp(&self) -> DateTime<FixedOffset> {
        self.author.timestamp()
    }
}

impl Packable for Commit {
    fn content(&self) -> anyhow::Result<Bytes> {
        let mut lines = vec![format!("tree {}", self.tree_oid)];
        lines.extend(self.parents.iter().map(|parent| format!("parent {parent}")));
        lines.push(format!("author {}", self.author.display()));
        lines.push(format!("committer {}", self.committer.display()));
        lines.push(String::new());
        lines.push(self.message.clone());

        Ok(Bytes::from(lines.join("\n")))
    }
}

impl Unpackable for Commit {
    fn deserialize(mut reader: impl BufRead) -> anyhow::Result<Self> {
        let mut content = String::new();
        reader.read_to_string(&mut content)?;

        let (headers, message) = content.split_once("\n\n").unwrap_or((content.as_str(), ""));

        let mut tree_oid = None;
        let mut parents = Vec::new();
        let mut author = None;
        let mut committer = None;

        for line in headers.lines() {
            // continuation of a multi-line header such as gpgsig
            if line.starts_with(' ') {
                continue;
            }
            let (key, value) = line.split_once(' ').unwrap_or((line, ""));
            match key {
                "tree" => tree_oid = Some(ObjectId::try_parse(value.to_string())?),
                "parent" => parents.push(ObjectId::try_parse(value.to_string())?),
                "author" => author = Some(Author::try_from(value)?),
                "committer" => committer = Some(Author::try_from(value)?),
                _ => {}
            }
        }

        let author = author.context("Invalid commit object: missing author line")?;
        Ok(Commit {
            parents,
            tree_oid: tree_oid.context("Invalid commit object: missing tree line")?,
            committer: committer.unwrap_or_else(|| author.clone()),
            author,
            message: message.to_string(),
        })
    }
}

impl Object for Commit {
    fn object_type(&self) -> ObjectType {
        ObjectType::Commit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::io::Cursor;

    fn oid(fill: char) -> ObjectId {
        ObjectId::try_parse(fill.to_string().repeat(40)).unwrap()
    }

    #[test]
    fn author_parses_name_with_spaces_and_timezone() {
        let author = Author::try_from("Ada Lovelace <ada@example.com> 1700000000 +0200").unwrap();

        assert_eq!(author.name(), "Ada Lovelace");
        assert_eq!(author.email(), "ada@example.com");
        assert_eq!(author.timestamp().timestamp(), 1_700_000_000);
        assert_eq!(author.timestamp().offset().local_minus_utc(), 2 * 3600);
        assert_eq!(author.display(), "Ada Lovelace <ada@example.com> 1700000000 +0200");
    }

    #[test]
    fn author_rejects_missing_email() {
        assert!(Author::try_from("Ada 1700000000 +0000").is_err());
    }

    #[test]
    fn deserialize_merge_commit_with_signature_header() {
        let raw = format!(
            "tree {}\nparent {}\nparent {}\nauthor A <a@x> 1700000000 +0000\ncommitter B <b@x> 1700000100 +0000\ngpgsig -----BEGIN-----\n abc\n -----END-----\n\nMerge branch 'topic'\n\nDetails",
            oid('a'),
            oid('b'),
            oid('c')
        );

        let commit = Commit::deserialize(Cursor::new(raw.into_bytes())).unwrap();

        assert_eq!(commit.parents(), &[oid('b'), oid('c')]);
        assert_eq!(commit.committer().name(), "B");
        assert_eq!(commit.short_message(), "Merge branch 'topic'");
        assert_eq!(commit.message(), "Merge branch 'topic'\n\nDetails");
    }

    #[test]
    fn content_round_trips_through_deserialize() {
        let author = Author::try_from("A <a@x> 1700000000 -0500").unwrap();
        let commit = Commit::new(vec![oid('d')], oid('e'), author, "Fix bug".to_string());

        let parsed = Commit::deserialize(Cursor::new(commit.content().unwrap().to_vec())).unwrap();

        assert_eq!(parsed, commit);
    }
}
