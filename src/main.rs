use anyhow::Result;
use clap::{Parser, Subcommand};
use is_terminal::IsTerminal;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;
use vislog::artifacts::core::Output;
use vislog::artifacts::graph::permanent_graph::SortOrder;
use vislog::artifacts::vislog::cache::DEFAULT_CACHE_SIZE;
use vislog::artifacts::vislog::commit_count::{
    CommitCountStage, DEFAULT_FIRST_STEP_COUNT, DEFAULT_INITIAL_COUNT, StageBudget,
};
use vislog::artifacts::vislog::session::{LogSession, SessionConfig};
use vislog::commands::porcelain::log::LogOptions;

/// Environment variable holding the tracing filter, e.g. `vislog=debug`
const LOG_FILTER_ENV: &str = "VISLOG_LOG";

#[derive(Parser)]
#[command(
    name = "vislog",
    version = "0.1.0",
    author = "Sami Barbut-Dica",
    about = "Filtered commit log over one or more repositories",
    long_about = "vislog shows the commits of one or more loose-object git repositories \
    that match a set of filters. Recent commits are filtered in memory; the repositories \
    are only walked when that does not find enough matches.",
    help_template = r"
{name} {version} - {about}

USAGE:
    {usage}

OPTIONS:
    {all-args}
",
)]
struct Cli {
    #[command(flatten)]
    budget: BudgetArgs,
    #[command(subcommand)]
    command: Commands,
}

#[derive(clap::Args)]
struct BudgetArgs {
    #[arg(
        long,
        global = true,
        env = "VISLOG_INITIAL_COUNT",
        default_value_t = DEFAULT_INITIAL_COUNT,
        help = "Matches the in-memory pass must find before repositories are walked"
    )]
    initial_count: usize,
    #[arg(
        long,
        global = true,
        env = "VISLOG_FIRST_STEP_COUNT",
        default_value_t = DEFAULT_FIRST_STEP_COUNT,
        help = "Commits each repository may return on the first walk"
    )]
    first_step_count: usize,
    #[arg(
        long,
        global = true,
        env = "VISLOG_CACHE_SIZE",
        default_value_t = DEFAULT_CACHE_SIZE,
        help = "Number of recent commits kept in memory"
    )]
    cache_size: usize,
}

#[derive(Subcommand)]
enum Commands {
    #[command(
        name = "log",
        about = "Show the commits matching the given filters",
        long_about = "This command shows the commits of the given repositories (the current \
        directory by default) that match every filter. A hash filter overrides all other filters."
    )]
    Log {
        #[arg(index = 1, help = "Repository roots to load")]
        repositories: Vec<PathBuf>,
        #[arg(short, long = "branch", allow_hyphen_values = true, help = "Branch to start from; -NAME excludes, globs allowed")]
        branches: Vec<String>,
        #[arg(long = "author", help = "Author name or email; `me` is the current user")]
        authors: Vec<String>,
        #[arg(long, help = "Text to look for in commit messages")]
        grep: Option<String>,
        #[arg(long, requires = "grep", help = "Treat --grep as a regular expression")]
        regex: bool,
        #[arg(long, requires = "grep", help = "Match --grep case-sensitively")]
        match_case: bool,
        #[arg(long, help = "Only commits authored at or after this date")]
        since: Option<String>,
        #[arg(long, help = "Only commits authored at or before this date")]
        until: Option<String>,
        #[arg(long = "hash", help = "Full or partial commit hash to show")]
        hashes: Vec<String>,
        #[arg(long = "root", help = "Only show commits of this repository root")]
        roots: Vec<PathBuf>,
        #[arg(long = "index", help = "Index this repository root in memory up front")]
        indexed: Vec<PathBuf>,
        #[arg(long, value_enum, default_value_t = SortOrder::Date, help = "Row order")]
        order: SortOrder,
        #[arg(long, value_enum, default_value_t = CommitCountStage::Initial, help = "Search budget to start with")]
        stage: CommitCountStage,
        #[arg(long, help = "Show each commit on a single line")]
        oneline: bool,
        #[arg(long, help = "Never page the output")]
        no_pager: bool,
        #[arg(index = 2, last = true, help = "Only commits touching these paths")]
        paths: Vec<PathBuf>,
    },
    #[command(
        name = "resolve",
        about = "Expand partial commit hashes",
        long_about = "This command prints the full hash and repository root of every commit \
        a partial hash identifies unambiguously within its root."
    )]
    Resolve {
        #[arg(index = 1, required = true, help = "Partial hashes to resolve")]
        prefixes: Vec<String>,
        #[arg(long = "repo", help = "Repository roots to search (the current directory by default)")]
        repositories: Vec<PathBuf>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_env(LOG_FILTER_ENV).unwrap_or_else(|_| EnvFilter::new("warn"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn repositories_or_current(repositories: Vec<PathBuf>) -> Result<Vec<PathBuf>> {
    if repositories.is_empty() {
        return Ok(vec![std::env::current_dir()?]);
    }
    Ok(repositories)
}

fn main() -> Result<()> {
    init_tracing();
    if !std::io::stdout().is_terminal() {
        colored::control::set_override(false);
    }

    let cli = Cli::parse();
    let mut config = SessionConfig {
        budget: StageBudget::new(cli.budget.initial_count, cli.budget.first_step_count),
        cache_size: cli.budget.cache_size,
        current_user: std::env::var("GIT_AUTHOR_NAME").ok(),
        ..SessionConfig::default()
    };

    match cli.command {
        Commands::Log {
            repositories,
            branches,
            authors,
            grep,
            regex,
            match_case,
            since,
            until,
            hashes,
            roots,
            indexed,
            order,
            stage,
            oneline,
            no_pager,
            paths,
        } => {
            config.indexed_roots = indexed;
            let session = LogSession::open(repositories_or_current(repositories)?, config)?;
            let options = LogOptions {
                branches,
                authors,
                grep,
                regex,
                match_case,
                since,
                until,
                hashes,
                roots,
                paths,
                order,
                stage,
                oneline,
            };

            let mut output = Output::open(!no_pager);
            let summary = session.log(&options, &mut output)?;
            output.finish()?;

            if summary.can_request_more {
                eprintln!(
                    "more commits may match; rerun with --stage {}",
                    match summary.stage {
                        CommitCountStage::Initial => "first-step",
                        CommitCountStage::FirstStep | CommitCountStage::All => "all",
                    }
                );
            }
        }
        Commands::Resolve {
            prefixes,
            repositories,
        } => {
            let session = LogSession::open(repositories_or_current(repositories)?, config)?;
            let mut output = Output::open(false);
            session.resolve_prefixes(&prefixes, &mut output)?;
            output.finish()?;
        }
    }

    Ok(())
}
