//! Manifest model, field validation, entrypoint discovery and the init/fix
//! flows of kiln.

pub mod discovery;
pub mod error;
pub mod fields;
pub mod init;
pub mod manifest;
pub mod package;
pub mod prompt;
pub mod settings;

pub use discovery::{AliasMap, aliases, resolve_entrypoints, resolve_package, resolve_project};
pub use error::{ConfigError, Result};
pub use fields::{Field, FieldContext, FieldProblem, ProblemKind, file_base, validate_package};
pub use init::{InitReport, Mode, fix, init};
pub use manifest::{MANIFEST_FILE, Manifest, TOOL_KEY, ToolConfig};
pub use package::{Entrypoint, Package, Project, StrictEntrypoint, StrictPackage};
pub use prompt::{AlwaysConfirm, Decision, NeverConfirm, Question};
pub use settings::Settings;
