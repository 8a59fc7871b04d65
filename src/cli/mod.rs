//! Command-line interface module.
//!
//! This module handles:
//! - Argument parsing via clap
//! - Output formatting (text, JSON)

mod args;
mod output;

pub use args::{Args, Command};
pub use output::{OutputFormat, OutputFormatter};
