//! History traversal over a loose-object repository
//!
//! - `rev_list`: commits reachable from a set of tips, newest first
//! - `tree_diff`: files changed between two trees
//! - `path_filter`: trie restricting tree walks to selected paths

pub mod path_filter;
pub mod rev_list;
pub mod tree_diff;
