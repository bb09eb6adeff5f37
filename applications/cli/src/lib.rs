//! Weave command-line front end
//!
//! Configuration loading and argument parsing live here so they can be tested
//! without going through the binary.

pub mod args;
pub mod config;
pub mod error;

pub use config::AppConfig;
pub use error::{CliError, Result};
