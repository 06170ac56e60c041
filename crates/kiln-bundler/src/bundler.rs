//! The bundling engine seam.
//!
//! kiln never transforms code itself. A [`Bundler`] takes a
//! [`BuildVariantConfig`] and returns a [`Bundle`] that can be rendered into
//! one or more output formats. Nothing here touches the output directory.

use std::fmt;
use std::path::PathBuf;

use async_trait::async_trait;

use crate::Result;
use crate::config::{BuildVariantConfig, OutputDescriptor};

/// One generated file, addressed by its final absolute path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputFile {
    pub path: PathBuf,
    pub code: String,
    pub map: Option<String>,
}

impl OutputFile {
    pub fn new(path: impl Into<PathBuf>, code: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            code: code.into(),
            map: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WarningKind {
    UnresolvedImport,
    CircularDependency,
    EmptyBundle,
    UnusedExternalImport,
    ThisRewritten,
    ImportOutsidePackage,
    Other(String),
}

impl WarningKind {
    /// Warnings that never fail a build.
    pub fn is_ignored(&self) -> bool {
        matches!(
            self,
            WarningKind::CircularDependency
                | WarningKind::EmptyBundle
                | WarningKind::UnusedExternalImport
                | WarningKind::ThisRewritten
        )
    }
}

impl fmt::Display for WarningKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            WarningKind::UnresolvedImport => write!(f, "UnresolvedImport"),
            WarningKind::CircularDependency => write!(f, "CircularDependency"),
            WarningKind::EmptyBundle => write!(f, "EmptyBundle"),
            WarningKind::UnusedExternalImport => write!(f, "UnusedExternalImport"),
            WarningKind::ThisRewritten => write!(f, "ThisRewritten"),
            WarningKind::ImportOutsidePackage => write!(f, "ImportOutsidePackage"),
            WarningKind::Other(s) => write!(f, "{s}"),
        }
    }
}

/// A diagnostic reported by the bundler that did not abort bundling.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BundleWarning {
    pub kind: WarningKind,
    pub message: String,
    /// The import specifier the warning is about, when there is one.
    pub specifier: Option<String>,
    pub importer: Option<String>,
}

impl BundleWarning {
    pub fn unresolved_import(specifier: impl Into<String>, importer: impl Into<String>) -> Self {
        let specifier = specifier.into();
        let importer = importer.into();
        Self {
            kind: WarningKind::UnresolvedImport,
            message: format!("could not resolve \"{specifier}\" from \"{importer}\""),
            specifier: Some(specifier),
            importer: Some(importer),
        }
    }
}

/// Files and warnings produced for one [`OutputDescriptor`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct GeneratedOutput {
    pub files: Vec<OutputFile>,
    pub warnings: Vec<BundleWarning>,
}

#[async_trait]
pub trait Bundler: Send + Sync {
    /// Parse and link the module graph for `config`.
    async fn bundle(&self, config: &BuildVariantConfig) -> Result<Box<dyn Bundle>>;
}

#[async_trait]
pub trait Bundle: Send {
    /// Render the bundle in the format described by `output`.
    async fn generate(&mut self, output: &OutputDescriptor) -> Result<GeneratedOutput>;
}
