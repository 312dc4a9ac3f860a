//! Commit visibility engine
//!
//! Decides which commits the log shows for a set of filters, preferring data
//! already in memory over walking repositories:
//!
//! - `metadata`: commit details and the getters that serve them
//! - `cache`: metadata of the most recent commits
//! - `commit_count`: the progressive search budget
//! - `index`: optional per-root details index
//! - `provider`: filtered history walks per repository root
//! - `data_pack` / `visible_pack`: the loaded snapshot and a filtered view of it
//! - `builder`: turns filters into a visible pack
//! - `session`: loads repositories and wires the pieces together

pub mod builder;
pub mod cache;
pub mod commit_count;
pub mod data_pack;
pub mod index;
pub mod metadata;
pub mod provider;
pub mod session;
pub mod visible_pack;
