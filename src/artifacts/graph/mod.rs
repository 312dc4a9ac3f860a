//! Commit graph model
//!
//! - `commit_id`: repository roots, commit ids and their dense indices
//! - `storage`: the bijection between commit ids and indices
//! - `permanent_graph`: the full DAG in permanent order
//! - `visible_graph`: the filtered, ordered view shown to the user

pub mod commit_id;
pub mod permanent_graph;
pub mod storage;
pub mod visible_graph;
