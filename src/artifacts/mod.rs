//! Log data structures and algorithms
//!
//! - `branch`: Branch names
//! - `core`: Shared utilities (output and pager)
//! - `filter`: Filters a log request can combine
//! - `graph`: Commit ids, the permanent graph and its visible views
//! - `log`: History walks and tree diffs over loose objects
//! - `objects`: Git object types (blob, tree, commit)
//! - `vislog`: The visibility engine deciding which commits a log shows

pub mod branch;
pub mod core;
pub mod filter;
pub mod graph;
pub mod log;
pub mod objects;
pub mod vislog;
