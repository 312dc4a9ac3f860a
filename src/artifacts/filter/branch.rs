//! Branch filter
//!
//! Each spec is one of:
//!
//! - `name`: include the branch with exactly that name
//! - `-name`: exclude it
//! - a pattern with `*` or `?`: glob over branch names, also negatable
//!
//! `@` is an alias for `HEAD`, which names the branch HEAD points to.

use crate::artifacts::branch::REF_ALIASES;
use anyhow::Context;
use regex::Regex;

#[derive(Debug, Clone)]
enum BranchPattern {
    Exact(String),
    Glob(Regex),
}

impl BranchPattern {
    fn parse(spec: &str) -> anyhow::Result<Self> {
        let spec = REF_ALIASES.get(spec).copied().unwrap_or(spec);
        if !spec.contains(['*', '?']) {
            return Ok(BranchPattern::Exact(spec.to_string()));
        }

        let mut pattern = String::from("^");
        for c in spec.chars() {
            match c {
                '*' => pattern.push_str(".*"),
                '?' => pattern.push('.'),
                other => pattern.push_str(&regex::escape(&other.to_string())),
            }
        }
        pattern.push('$');

        Regex::new(&pattern)
            .map(BranchPattern::Glob)
            .with_context(|| format!("Invalid branch pattern: {spec}"))
    }

    fn matches(&self, name: &str) -> bool {
        match self {
            BranchPattern::Exact(exact) => exact == name,
            BranchPattern::Glob(glob) => glob.is_match(name),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BranchFilter {
    specs: Vec<String>,
    includes: Vec<BranchPattern>,
    excludes: Vec<BranchPattern>,
}

impl BranchFilter {
    pub fn new(specs: Vec<String>) -> anyhow::Result<Self> {
        let mut includes = Vec::new();
        let mut excludes = Vec::new();

        for spec in &specs {
            match spec.strip_prefix('-') {
                Some(excluded) => excludes.push(BranchPattern::parse(excluded)?),
                None => includes.push(BranchPattern::parse(spec)?),
            }
        }

        Ok(BranchFilter {
            specs,
            includes,
            excludes,
        })
    }

    pub fn specs(&self) -> &[String] {
        &self.specs
    }

    pub fn matches(&self, name: &str) -> bool {
        let included =
            self.includes.is_empty() || self.includes.iter().any(|pattern| pattern.matches(name));

        included && !self.excludes.iter().any(|pattern| pattern.matches(name))
    }
}
