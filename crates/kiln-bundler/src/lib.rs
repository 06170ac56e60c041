//! # kiln-bundler
//!
//! Turns validated packages into build variant configurations, drives a
//! [`Bundler`] over them and writes the results.
//!
//! ```no_run
//! use std::sync::Arc;
//! use kiln_bundler::{BuildCoordinator, BuildResources, CommandInstaller, RolldownBundler};
//! use kiln_config::{AlwaysConfirm, resolve_project};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let project = resolve_project(".")?;
//! let resources = Arc::new(BuildResources::new(None));
//! let coordinator = BuildCoordinator::new(
//!     Arc::new(RolldownBundler::new()),
//!     Arc::new(AlwaysConfirm),
//!     Arc::new(CommandInstaller::detect(project.directory())),
//!     Arc::clone(&resources),
//! );
//! let report = coordinator.build(project.into_packages()).await?;
//! resources.dispose();
//! println!("built {} files", report.files.len());
//! # Ok(()) }
//! ```

pub mod backend;
pub mod bundler;
pub mod config;
pub mod coordinator;
pub mod dev;
pub mod dts;
pub mod externals;
pub mod installer;
pub mod other_files;
pub mod resources;
pub mod target;
pub mod writer;

use std::path::PathBuf;

pub use backend::RolldownBundler;
pub use bundler::{Bundle, BundleWarning, Bundler, GeneratedOutput, OutputFile, WarningKind};
pub use config::{
    BuildVariantConfig, ExportMode, OutputDescriptor, OutputFormat, PluginChain, Variant,
    build_configs,
};
pub use coordinator::{Attempt, BuildCoordinator, BuildReport, PendingDecision};
pub use dev::write_dev_files;
pub use dts::{Declaration, DeclarationGenerator};
#[cfg(feature = "dts-generation")]
pub use dts::IsolatedDeclarations;
pub use externals::Externals;
pub use installer::{CommandInstaller, InstallRequest, PackageInstaller, PackageManager};
pub use other_files::other_files;
pub use resources::BuildResources;
pub use target::{RuntimeEnvironment, is_node_builtin};
pub use writer::{clean_directory, write_outputs};

/// Error types for kiln-bundler operations.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// Manifest or entrypoint problem.
    #[error(transparent)]
    Config(#[from] kiln_config::ConfigError),

    /// A recoverable dependency was missing and installing it was declined.
    #[error(
        "{package}: {dependency} is needed to build this package but it is not in dependencies and installing it was declined"
    )]
    MissingDependency { package: String, dependency: String },

    #[error(
        "{package}: \"{specifier}\" is imported by \"{importer}\" but the package is not specified in dependencies or peerDependencies"
    )]
    UndeclaredDependency {
        package: String,
        specifier: String,
        importer: String,
    },

    #[error(
        "{package}: \"{specifier}\" is imported by \"{importer}\" and resolves outside of the package directory"
    )]
    ImportOutsidePackage {
        package: String,
        specifier: String,
        importer: String,
    },

    #[error(
        "{package}: the code checks `typeof window` or `typeof document` but the package has no `browser` field"
    )]
    BrowserGlobalsWithoutBrowserField { package: String },

    #[error("{package}: could not find the package.json of dependency {dependency}")]
    DependencyManifestNotFound { package: String, dependency: String },

    /// Unrecognized bundler error or warning.
    #[error("{package}: {message}")]
    Bundler { package: String, message: String },

    #[error(
        "{package}: failed to generate TypeScript declarations for {}: {message}. This is an internal error, please report it",
        .path.display()
    )]
    Declarations {
        package: String,
        path: PathBuf,
        message: String,
    },

    #[error("failed to install {packages} in {}: {message}", .cwd.display())]
    Install {
        packages: String,
        cwd: PathBuf,
        message: String,
    },

    /// Invalid output path (e.g., directory traversal attempt).
    #[error("Invalid output path: {0}")]
    InvalidOutputPath(String),

    /// File write operation failed.
    #[error("Write failure: {0}")]
    WriteFailure(String),

    #[error("the build worker pool has been disposed")]
    PoolClosed,

    #[error("build task failed: {0}")]
    Task(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type alias for kiln-bundler operations.
pub type Result<T> = std::result::Result<T, Error>;

impl Error {
    /// Package the error is attributed to, when known.
    pub fn package(&self) -> Option<&str> {
        match self {
            Error::Config(e) => e.package(),
            Error::MissingDependency { package, .. }
            | Error::UndeclaredDependency { package, .. }
            | Error::ImportOutsidePackage { package, .. }
            | Error::BrowserGlobalsWithoutBrowserField { package }
            | Error::DependencyManifestNotFound { package, .. }
            | Error::Bundler { package, .. }
            | Error::Declarations { package, .. } => Some(package),
            _ => None,
        }
    }
}

impl miette::Diagnostic for Error {
    fn code(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        Some(Box::new(match self {
            Error::Config(_) => "CONFIG_ERROR",
            Error::MissingDependency { .. } => "MISSING_DEPENDENCY",
            Error::UndeclaredDependency { .. } => "UNDECLARED_DEPENDENCY",
            Error::ImportOutsidePackage { .. } => "IMPORT_OUTSIDE_PACKAGE",
            Error::BrowserGlobalsWithoutBrowserField { .. } => "BROWSER_FIELD_REQUIRED",
            Error::DependencyManifestNotFound { .. } => "DEPENDENCY_MANIFEST_NOT_FOUND",
            Error::Bundler { .. } => "BUNDLER_ERROR",
            Error::Declarations { .. } => "DECLARATIONS_ERROR",
            Error::Install { .. } => "INSTALL_ERROR",
            Error::InvalidOutputPath(_) => "INVALID_OUTPUT_PATH",
            Error::WriteFailure(_) => "WRITE_FAILURE",
            Error::PoolClosed => "POOL_CLOSED",
            Error::Task(_) => "TASK_FAILED",
            Error::Io(_) => "IO_ERROR",
        }))
    }

    fn severity(&self) -> Option<miette::Severity> {
        Some(miette::Severity::Error)
    }

    fn help(&self) -> Option<Box<dyn std::fmt::Display + '_>> {
        match self {
            Error::MissingDependency { dependency, .. } => Some(Box::new(format!(
                "Add {dependency} to dependencies, or rerun and accept the install."
            ))),
            Error::UndeclaredDependency { specifier, .. } => Some(Box::new(format!(
                "Add the package of \"{specifier}\" to dependencies or peerDependencies."
            ))),
            Error::ImportOutsidePackage { .. } => Some(Box::new(
                "Packages may only import files inside their own directory. Import siblings by package name instead.",
            )),
            Error::BrowserGlobalsWithoutBrowserField { .. } => Some(Box::new(
                "Run `kiln fix` after adding a `browser` field, or accept the prompt to add it.",
            )),
            Error::DependencyManifestNotFound { .. } => {
                Some(Box::new("Install dependencies before building."))
            }
            Error::InvalidOutputPath(path) => Some(Box::new(format!(
                "The output path '{path}' is invalid. Ensure it's within the entrypoint's dist directory."
            ))),
            Error::WriteFailure(_) => Some(Box::new("Check disk space and permissions.")),
            _ => None,
        }
    }
}
