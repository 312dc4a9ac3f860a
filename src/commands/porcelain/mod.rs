//! Porcelain commands
//!
//! - `log`: Show the commits visible for a set of filters

pub mod log;
