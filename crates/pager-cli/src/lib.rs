//! Library side of the pager demo CLI.
//!
//! The binary only parses arguments and prints tables; the commands and the
//! catalog live here so integration tests can drive them.

pub mod catalog;
pub mod commands;
pub mod logging;
pub mod types;
