//! vislog: which commits a version-control log shows
//!
//! - `areas`: loose-object repositories on disk
//! - `artifacts`: objects, filters, graphs and the visibility engine
//! - `commands`: the `log` and `resolve` commands

pub mod areas;
pub mod artifacts;
pub mod commands;
