//! Branch names
//!
//! Validation follows `git check-ref-format`: names that could never be
//! created as branches are rejected up front, which also guarantees that
//! glob characters (`*`, `?`) in branch filters cannot collide with real names.

pub mod branch_name;

pub const INVALID_BRANCH_NAME_REGEX: &str =
    r"^\.|\/\.|\.\.|^\/|\/$|\.lock$|@\{|[\x00-\x20\*:\?\[\\~\^\x7f]";

/// Shorthands accepted wherever a branch name is expected
pub const REF_ALIASES: phf::Map<&'static str, &'static str> = phf::phf_map! {
    "@" => "HEAD",
};
