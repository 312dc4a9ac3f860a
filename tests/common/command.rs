use assert_cmd::Command;
use std::path::Path;

pub fn run_vislog_command(dir: &Path, args: &[&str]) -> Command {
    let mut cmd = Command::cargo_bin("vislog").expect("Failed to find vislog binary");
    cmd.envs(vec![("NO_PAGER", "1"), ("NO_COLOR", "1")]);
    cmd.env_remove("GIT_AUTHOR_NAME");
    cmd.env_remove("VISLOG_CACHE_SIZE");
    cmd.env_remove("VISLOG_INITIAL_COUNT");
    cmd.env_remove("VISLOG_FIRST_STEP_COUNT");
    cmd.current_dir(dir);
    for arg in args {
        cmd.arg(arg);
    }
    cmd
}

/// Messages of a successful `vislog log --oneline` run, newest first
pub fn oneline_messages(dir: &Path, args: &[&str]) -> Vec<String> {
    let mut all_args = vec!["log", "--oneline"];
    all_args.extend_from_slice(args);

    let output = run_vislog_command(dir, &all_args).output().expect("vislog did not run");
    assert!(
        output.status.success(),
        "vislog failed: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    String::from_utf8(output.stdout)
        .expect("output is not utf-8")
        .lines()
        .map(strip_hash_and_refs)
        .collect()
}

fn strip_hash_and_refs(line: &str) -> String {
    let line = match line.strip_prefix('[') {
        Some(rooted) => rooted.split_once("] ").map_or("", |(_, rest)| rest),
        None => line,
    };
    let rest = line.split_once(' ').map_or("", |(_, rest)| rest);
    let rest = match rest.strip_prefix('(') {
        Some(decorated) => decorated.split_once(") ").map_or("", |(_, message)| message),
        None => rest,
    };
    rest.to_string()
}
