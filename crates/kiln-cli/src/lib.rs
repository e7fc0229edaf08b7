//! Kiln CLI - builds a component library into every configured module format.
//!
//! - [`cli`] - clap definitions
//! - [`commands`] - one module per subcommand
//! - [`error`] - `CliError` and its miette conversion
//! - [`logger`] - tracing subscriber setup
//! - [`ui`] - status lines and the size report

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod ui;

pub use error::{CliError, Result};
