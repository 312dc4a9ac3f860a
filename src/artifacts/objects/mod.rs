//! Git object types and operations
//!
//! The log engine reads three kinds of loose objects:
//!
//! - **Blob**: File content (raw bytes), only written by repository fixtures
//! - **Tree**: Directory listing (names, modes, and object IDs), used to find
//!   the paths a commit touched
//! - **Commit**: Tree, parents, author, committer and message
//!
//! All objects share the loose object format `<type> <size>\0<content>`.

pub mod blob;
pub mod commit;
pub mod object;
pub mod object_id;
pub mod object_type;
pub mod tree;

/// Length of a SHA-1 hash in hexadecimal format
pub const OBJECT_ID_LENGTH: usize = 40;

/// Shortest hash prefix accepted for partial hash lookups
pub const MIN_PREFIX_LENGTH: usize = 4;
