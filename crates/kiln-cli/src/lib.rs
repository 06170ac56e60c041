//! kiln CLI - build JavaScript and TypeScript packages and monorepos.
//!
//! # Modules
//!
//! - [`cli`] - Argument definitions (clap)
//! - [`commands`] - `init`, `build`, `dev`, `fix`, `validate` and `watch`
//! - [`error`] - CLI error type and miette rendering
//! - [`logger`] - tracing subscriber setup
//! - [`prompt`] - Terminal yes/no questions
//! - [`ui`] - Status lines, spinner and build summary
//! - [`watcher`] - Debounced file watching

pub mod cli;
pub mod commands;
pub mod error;
pub mod logger;
pub mod prompt;
pub mod ui;
pub mod watcher;

pub use error::{CliError, Result};
