//! Plumbing commands
//!
//! - `resolve`: Expand partial hashes to full commit ids

pub mod resolve;
