use crate::artifacts::filter::FilterCollection;
use crate::artifacts::filter::branch::BranchFilter;
use crate::artifacts::filter::details::{DateFilter, TextFilter, UserFilter};
use crate::artifacts::filter::hash::HashFilter;
use crate::artifacts::filter::structure::{RootFilter, StructureFilter};
use crate::artifacts::graph::commit_id::{CommitIndex, RepositoryRoot};
use crate::artifacts::graph::permanent_graph::SortOrder;
use crate::artifacts::vislog::commit_count::CommitCountStage;
use crate::artifacts::vislog::metadata::CommitMetadata;
use crate::artifacts::vislog::session::LogSession;
use anyhow::Context;
use colored::Colorize;
use std::io::Write;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Default)]
pub struct LogOptions {
    pub branches: Vec<String>,
    pub authors: Vec<String>,
    pub grep: Option<String>,
    pub regex: bool,
    pub match_case: bool,
    pub since: Option<String>,
    pub until: Option<String>,
    pub hashes: Vec<String>,
    /// Only show commits of these repositories
    pub roots: Vec<PathBuf>,
    /// Only show commits touching these files or directories
    pub paths: Vec<PathBuf>,
    pub order: SortOrder,
    pub stage: CommitCountStage,
    pub oneline: bool,
}

/// What a log run showed, for the caller to report on
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogSummary {
    pub shown: usize,
    pub stage: CommitCountStage,
    pub can_request_more: bool,
}

impl LogOptions {
    pub fn filters(&self, base: &Path) -> anyhow::Result<FilterCollection> {
        let mut filters = FilterCollection::new();

        if !self.branches.is_empty() {
            filters = filters.with_branch(BranchFilter::new(self.branches.clone())?);
        }
        if !self.authors.is_empty() {
            filters = filters.with_user(UserFilter::new(self.authors.clone()));
        }
        if let Some(grep) = &self.grep {
            filters = filters.with_text(TextFilter::new(grep, self.regex, self.match_case)?);
        }
        if self.since.is_some() || self.until.is_some() {
            let after = self.since.as_deref().map(DateFilter::parse_since).transpose()?;
            let before = self.until.as_deref().map(DateFilter::parse_until).transpose()?;
            filters = filters.with_date(DateFilter::new(after, before));
        }
        if !self.hashes.is_empty() {
            filters = filters.with_hash(HashFilter::new(self.hashes.iter().cloned()));
        }
        if !self.roots.is_empty() {
            let roots = self
                .roots
                .iter()
                .map(|root| {
                    base.join(root)
                        .canonicalize()
                        .map(RepositoryRoot::new)
                        .with_context(|| format!("root {} does not exist", root.display()))
                })
                .collect::<anyhow::Result<Vec<_>>>()?;
            filters = filters.with_root(RootFilter::new(roots));
        }
        if !self.paths.is_empty() {
            let paths = self.paths.iter().map(|path| absolute(base, path));
            filters = filters.with_structure(StructureFilter::new(paths));
        }

        Ok(filters)
    }
}

/// `path` made absolute against `base`, resolving symlinks when it exists
fn absolute(base: &Path, path: &Path) -> PathBuf {
    let joined = base.join(path);
    joined.canonicalize().unwrap_or(joined)
}

impl LogSession {
    pub fn log(&self, options: &LogOptions, writer: &mut impl Write) -> anyhow::Result<LogSummary> {
        let base = std::env::current_dir().context("unable to read the current directory")?;
        let filters = options.filters(&base)?;
        let (pack, stage) = self.build(options.order, &filters, options.stage);

        let show_roots = self.data_pack().roots().len() > 1;
        for (position, commit) in pack.visible_graph().commits().enumerate() {
            let metadata = self.details(commit)?;
            if options.oneline {
                self.show_commit_oneline(&metadata, show_roots, writer)?;
            } else {
                if position > 0 {
                    writeln!(writer)?;
                }
                self.show_commit_medium(&metadata, show_roots, writer)?;
            }
        }

        Ok(LogSummary {
            shown: pack.visible_graph().len(),
            stage,
            can_request_more: pack.can_request_more(),
        })
    }

    fn show_commit_medium(
        &self,
        metadata: &CommitMetadata,
        show_roots: bool,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        writeln!(
            writer,
            "{}{}",
            format!("commit {}", metadata.hash).yellow(),
            self.decoration(metadata.index)
        )?;
        if show_roots {
            writeln!(writer, "Root:   {}", metadata.root.name())?;
        }
        writeln!(writer, "Author: {}", metadata.author.display_name())?;
        writeln!(writer, "Date:   {}", metadata.author.readable_timestamp())?;
        writeln!(writer)?;
        for message_line in metadata.message.lines() {
            writeln!(writer, "    {message_line}")?;
        }

        Ok(())
    }

    fn show_commit_oneline(
        &self,
        metadata: &CommitMetadata,
        show_roots: bool,
        writer: &mut impl Write,
    ) -> anyhow::Result<()> {
        let root = if show_roots {
            format!("[{}] ", metadata.root.name())
        } else {
            String::new()
        };

        writeln!(
            writer,
            "{root}{}{} {}",
            metadata.hash.to_short_oid().yellow(),
            self.decoration(metadata.index),
            metadata.short_message()
        )?;

        Ok(())
    }

    /// ` (HEAD, main, topic)` for the refs pointing at `commit`
    fn decoration(&self, commit: CommitIndex) -> String {
        let (heads, branches): (Vec<_>, Vec<_>) = self
            .data_pack()
            .refs_of(commit)
            .partition(|vcs_ref| vcs_ref.name.is_head());
        if heads.is_empty() && branches.is_empty() {
            return String::new();
        }

        let mut branch_names = branches
            .iter()
            .map(|vcs_ref| vcs_ref.name.to_string())
            .collect::<Vec<_>>();
        branch_names.sort();
        let names = heads
            .iter()
            .map(|vcs_ref| vcs_ref.name.to_string().cyan().bold().to_string())
            .chain(branch_names.into_iter().map(|name| name.green().bold().to_string()))
            .collect::<Vec<_>>()
            .join(", ");

        format!(" ({names})")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::areas::repository::tests::RepositoryFixture;
    use crate::artifacts::vislog::session::SessionConfig;
    use pretty_assertions::assert_eq;
    use rstest::{fixture, rstest};

    #[fixture]
    fn repository() -> RepositoryFixture {
        colored::control::set_override(false);
        let mut fixture = RepositoryFixture::new();
        fixture.commit("Ada", 1_700_000_000, "Initial commit", &[("README", "hello")]);
        fixture.branch_off("topic");
        fixture.commit("Linus", 1_700_000_100, "Add parser\n\nWith a body", &[("src/lib.rs", "")]);
        fixture
    }

    fn run(fixture: &RepositoryFixture, options: &LogOptions) -> (String, LogSummary) {
        let session = LogSession::open([fixture.root().path()], SessionConfig::default()).unwrap();
        let mut output = Vec::new();
        let summary = session.log(options, &mut output).unwrap();
        (String::from_utf8(output).unwrap(), summary)
    }

    #[rstest]
    fn oneline_shows_decorations(repository: RepositoryFixture) {
        let options = LogOptions {
            oneline: true,
            ..LogOptions::default()
        };

        let (output, summary) = run(&repository, &options);

        let lines = output.lines().collect::<Vec<_>>();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].ends_with("(HEAD, topic) Add parser"), "{output}");
        assert!(lines[1].ends_with("(main) Initial commit"), "{output}");
        assert_eq!(summary.shown, 2);
    }

    #[rstest]
    fn medium_format_prints_the_whole_message(repository: RepositoryFixture) {
        let options = LogOptions {
            authors: vec!["linus".to_string()],
            stage: CommitCountStage::All,
            ..LogOptions::default()
        };

        let (output, summary) = run(&repository, &options);

        assert!(output.starts_with("commit "), "{output}");
        assert!(output.contains("Author: Linus <linus@example.com>"), "{output}");
        assert!(output.contains("\n    Add parser\n    \n    With a body\n"), "{output}");
        assert!(!output.contains("Root:"));
        assert_eq!(summary.stage, CommitCountStage::All);
    }

    #[rstest]
    fn invalid_regex_is_an_error(repository: RepositoryFixture) {
        let options = LogOptions {
            grep: Some("(".to_string()),
            regex: true,
            ..LogOptions::default()
        };
        let session = LogSession::open([repository.root().path()], SessionConfig::default()).unwrap();

        assert!(session.log(&options, &mut Vec::new()).is_err());
    }

    #[test]
    fn relative_paths_are_resolved_against_the_base() {
        let options = LogOptions {
            paths: vec![PathBuf::from("src/missing.rs")],
            ..LogOptions::default()
        };

        let filters = options.filters(Path::new("/work/repo")).unwrap();

        let paths = filters.structure().unwrap().paths().collect::<Vec<_>>();
        assert_eq!(paths, vec![Path::new("/work/repo/src/missing.rs")]);
    }
}
