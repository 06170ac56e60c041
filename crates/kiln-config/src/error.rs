//! Error types for manifest loading, validation and entrypoint resolution.

use std::path::PathBuf;

use thiserror::Error;

use crate::fields::Field;

pub type Result<T> = std::result::Result<T, ConfigError>;

#[derive(Debug, Error)]
pub enum ConfigError {
    // Manifest loading errors
    #[error("no package.json found in {}", .0.display())]
    NoManifest(PathBuf),

    #[error("invalid package.json at {}: {message}", .path.display())]
    InvalidJson { path: PathBuf, message: String },

    #[error("invalid `{field}` in {}: {message}", .path.display())]
    InvalidValue {
        path: PathBuf,
        field: String,
        message: String,
    },

    // Resolution errors
    #[error("no source file found for entrypoint '{entrypoint}' in {package}")]
    NoSource { package: String, entrypoint: String },

    #[error("entrypoint '{entrypoint}' in {package} has no package.json")]
    NoEntrypointManifest { package: String, entrypoint: String },

    #[error(
        "entrypoint source {} of {package} is outside the package directory {}",
        .source_path.display(),
        .directory.display()
    )]
    EntrypointOutsidePackageDirectory {
        package: String,
        source_path: PathBuf,
        directory: PathBuf,
    },

    #[error("invalid package glob '{pattern}': {message}")]
    InvalidGlob { pattern: String, message: String },

    // Strict validation errors
    #[error("package at {} has no name", .0.display())]
    MissingName(PathBuf),

    #[error("{package}: `{field}` field is invalid, it should be {expected}")]
    InvalidField {
        package: String,
        field: Field,
        expected: String,
    },

    #[error("{package}: `{field}` field is missing, it should be {expected}")]
    MissingField {
        package: String,
        field: Field,
        expected: String,
    },

    #[error("{package}: `umd:main` is set but no `kiln.umdName` was specified")]
    UmdNameNotSpecified { package: String },

    // Orchestration errors
    #[error("{package}: the `main` field is required to build this package")]
    MainFieldDeclined { package: String },

    #[error("decision interface failed: {0}")]
    Decision(String),

    #[error("invalid settings: {0}")]
    Settings(String),

    // I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ConfigError {
    /// Package name the error is attributed to, when known.
    pub fn package(&self) -> Option<&str> {
        match self {
            ConfigError::NoSource { package, .. }
            | ConfigError::NoEntrypointManifest { package, .. }
            | ConfigError::EntrypointOutsidePackageDirectory { package, .. }
            | ConfigError::InvalidField { package, .. }
            | ConfigError::MissingField { package, .. }
            | ConfigError::UmdNameNotSpecified { package }
            | ConfigError::MainFieldDeclined { package } => Some(package),
            _ => None,
        }
    }
}
