//! On-disk repository components
//!
//! - `database`: Loose object storage (zlib-compressed, SHA-1 addressed)
//! - `refs`: Branch and HEAD references
//! - `repository`: A working directory tying the two together

pub mod database;
pub mod refs;
pub mod repository;
