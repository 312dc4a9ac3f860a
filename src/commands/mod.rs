//! Command implementations
//!
//! Commands follow Git's split:
//!
//! - `plumbing`: Low-level commands for scripts (resolve)
//! - `porcelain`: User-facing commands (log)
//!
//! Both are implemented on [`crate::artifacts::vislog::session::LogSession`]
//! and write to any `std::io::Write`.

pub mod plumbing;
pub mod porcelain;
