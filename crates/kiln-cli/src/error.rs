//! Error handling for the kiln CLI.
//!
//! `CliError` wraps the library errors via `#[from]` and adds the failures
//! that only exist at the command line (bad arguments, watcher errors,
//! validation findings). [`ResultExt`] attaches paths, hints and context.
//!
//! ```rust,no_run
//! use kiln_cli::error::{Result, ResultExt};
//! use std::path::Path;
//!
//! fn read_settings(path: &Path) -> Result<String> {
//!     std::fs::read_to_string(path)
//!         .with_path(path)
//!         .with_hint("Create a kiln.toml or remove the broken one")
//! }
//! ```

mod report;

use std::path::PathBuf;
use thiserror::Error;

pub use report::cli_error_to_miette;

/// Top-level CLI error type.
#[derive(Debug, Error)]
pub enum CliError {
    /// Manifest, entrypoint or settings problem
    #[error(transparent)]
    Config(#[from] kiln_config::ConfigError),

    /// Build failure reported by the coordinator
    #[error(transparent)]
    Build(#[from] kiln_bundler::Error),

    /// Invalid command-line arguments or options
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// File or directory not found
    #[error("File not found: {}", .0.display())]
    FileNotFound(PathBuf),

    /// I/O errors from file system operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// File watching errors
    #[error("File watcher error: {0}")]
    Watch(#[from] notify::Error),

    /// `kiln validate` found problems; each one has already been printed
    #[error("found {problems} problem{} in package.json files", plural(.problems))]
    Validation { problems: usize },

    /// Generic errors with custom messages
    #[error("{0}")]
    Custom(String),
}

fn plural(count: &usize) -> &'static str {
    if *count == 1 { "" } else { "s" }
}

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// Extension trait for adding context to errors.
pub trait ResultExt<T> {
    /// Turn a "not found" I/O error into [`CliError::FileNotFound`] for `path`,
    /// and prefix any other error with the path.
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T>;

    /// Append a hint line to the error message.
    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T>;

    /// Prefix the error message with `msg`.
    fn context(self, msg: impl std::fmt::Display) -> Result<T>;
}

impl<T, E: Into<CliError>> ResultExt<T> for std::result::Result<T, E> {
    fn with_path(self, path: impl AsRef<std::path::Path>) -> Result<T> {
        self.map_err(|e| match e.into() {
            CliError::Io(io) if io.kind() == std::io::ErrorKind::NotFound => {
                CliError::FileNotFound(path.as_ref().to_path_buf())
            }
            other => CliError::Custom(format!("{}: {}", path.as_ref().display(), other)),
        })
    }

    fn with_hint(self, hint: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| CliError::Custom(format!("{}\n\nHint: {}", e.into(), hint)))
    }

    fn context(self, msg: impl std::fmt::Display) -> Result<T> {
        self.map_err(|e| CliError::Custom(format!("{}: {}", msg, e.into())))
    }
}
