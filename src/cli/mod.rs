//! Command-line interface for harvest.

mod commands;
pub mod helpers;

pub use commands::{is_quiet, is_verbose, run};
