//! Library components of the `lei-resolver` command.

pub mod config;
pub mod logging;
