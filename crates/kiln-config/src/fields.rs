//! Expected values of the public-interface fields and drift detection.
//!
//! Everything here is pure: validators read a [`Manifest`] and compute what a
//! field should contain. Mutation happens in [`crate::init`] after the user
//! (or `--yes`) has confirmed it.

use std::fmt;

use serde_json::{Map, Value, json};

use crate::error::{ConfigError, Result};
use crate::manifest::Manifest;
use crate::package::Package;

/// A manifest field kiln derives from the package name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Field {
    Main,
    Module,
    UmdMain,
    Browser,
    Types,
}

impl Field {
    /// Fields in the order they are checked and asked about.
    pub const ALL: [Field; 5] = [
        Field::Main,
        Field::Module,
        Field::UmdMain,
        Field::Browser,
        Field::Types,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Field::Main => "main",
            Field::Module => "module",
            Field::UmdMain => "umd:main",
            Field::Browser => "browser",
            Field::Types => "types",
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

/// Strip the scope from a package name: `@scope/pkg` becomes `pkg`.
pub fn file_base(package_name: &str) -> &str {
    match package_name.strip_prefix('@') {
        Some(scoped) => scoped.split_once('/').map_or(package_name, |(_, name)| name),
        None => package_name,
    }
}

/// Inputs every field derivation depends on, captured from one manifest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldContext {
    pub package: String,
    pub file_base: String,
    pub has_module: bool,
    pub umd_name: Option<String>,
}

impl FieldContext {
    /// Capture the context for the manifest describing an entrypoint's outputs.
    pub fn new(package_name: &str, manifest: &Manifest) -> Result<Self> {
        Ok(Self {
            package: package_name.to_string(),
            file_base: file_base(package_name).to_string(),
            has_module: manifest.field(Field::Module.key()).is_some(),
            umd_name: manifest.tool_config()?.umd_name,
        })
    }

    fn dist(&self, suffix: &str) -> String {
        format!("dist/{}.{suffix}", self.file_base)
    }
}

/// Compute the value `field` must hold.
///
/// # Errors
///
/// [`ConfigError::UmdNameNotSpecified`] for `umd:main` when no `kiln.umdName`
/// is configured.
pub fn expected(field: Field, ctx: &FieldContext) -> Result<Value> {
    let value = match field {
        Field::Main => Value::String(ctx.dist("cjs.js")),
        Field::Module => Value::String(ctx.dist("esm.js")),
        Field::UmdMain => {
            if ctx.umd_name.is_none() {
                return Err(ConfigError::UmdNameNotSpecified {
                    package: ctx.package.clone(),
                });
            }
            Value::String(ctx.dist("umd.min.js"))
        }
        Field::Browser => {
            let mut replacements = Map::new();
            replacements.insert(
                format!("./{}", ctx.dist("cjs.js")),
                json!(format!("./{}", ctx.dist("browser.cjs.js"))),
            );
            if ctx.has_module {
                replacements.insert(
                    format!("./{}", ctx.dist("esm.js")),
                    json!(format!("./{}", ctx.dist("browser.esm.js"))),
                );
            }
            Value::Object(replacements)
        }
        Field::Types => Value::String(ctx.dist("cjs.d.ts")),
    };
    Ok(value)
}

/// Whether `manifest` holds exactly the expected value for `field`.
/// A missing field is never valid.
pub fn is_valid(field: Field, ctx: &FieldContext, manifest: &Manifest) -> Result<bool> {
    let expected = expected(field, ctx)?;
    Ok(manifest.field(field.key()) == Some(&expected))
}

/// Write the expected value of `field` into `manifest` (in memory only).
pub fn fix(field: Field, ctx: &FieldContext, manifest: &mut Manifest) -> Result<()> {
    let value = expected(field, ctx)?;
    manifest.set_field(field.key(), value);
    Ok(())
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProblemKind {
    Missing,
    Invalid,
    UmdNameNotSpecified,
}

/// One field that fails validation, with enough context to explain it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldProblem {
    pub package: String,
    pub entrypoint: String,
    pub field: Field,
    pub kind: ProblemKind,
    pub expected: Option<Value>,
}

impl FieldProblem {
    pub fn hint(&self) -> String {
        match self.kind {
            ProblemKind::UmdNameNotSpecified => {
                "add a `kiln.umdName` entry naming the UMD global".to_string()
            }
            ProblemKind::Missing | ProblemKind::Invalid => {
                "run `kiln fix` to repair it".to_string()
            }
        }
    }

    pub fn into_error(self) -> ConfigError {
        let expected = self
            .expected
            .map(|v| v.to_string())
            .unwrap_or_default();
        match self.kind {
            ProblemKind::Missing => ConfigError::MissingField {
                package: self.package,
                field: self.field,
                expected,
            },
            ProblemKind::Invalid => ConfigError::InvalidField {
                package: self.package,
                field: self.field,
                expected,
            },
            ProblemKind::UmdNameNotSpecified => ConfigError::UmdNameNotSpecified {
                package: self.package,
            },
        }
    }
}

impl fmt::Display for FieldProblem {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let location = if self.entrypoint == "." {
            self.package.clone()
        } else {
            format!("{}/{}", self.package, self.entrypoint)
        };
        match (&self.kind, &self.expected) {
            (ProblemKind::Missing, Some(expected)) => write!(
                f,
                "{location}: `{}` field is missing, it should be {expected}",
                self.field
            ),
            (ProblemKind::Invalid, Some(expected)) => write!(
                f,
                "{location}: `{}` field is invalid, it should be {expected}",
                self.field
            ),
            (ProblemKind::UmdNameNotSpecified, _) => write!(
                f,
                "{location}: `umd:main` is set but no `kiln.umdName` was specified"
            ),
            (_, None) => write!(f, "{location}: `{}` field is invalid", self.field),
        }
    }
}

/// Collect every field problem of a package.
///
/// `main` must be present and valid; optional fields are checked only when
/// present.
pub fn validate_package(package: &Package) -> Result<Vec<FieldProblem>> {
    let mut problems = Vec::new();

    for entrypoint in package.entrypoints() {
        let manifest = package.entrypoint_manifest(entrypoint);
        let ctx = FieldContext::new(package.name(), manifest)?;

        for field in Field::ALL {
            let present = manifest.field(field.key()).is_some();
            if !present && field != Field::Main {
                continue;
            }

            let problem = |kind, expected| FieldProblem {
                package: package.name().to_string(),
                entrypoint: entrypoint.name().to_string(),
                field,
                kind,
                expected,
            };

            match expected(field, &ctx) {
                Ok(value) if !present => problems.push(problem(ProblemKind::Missing, Some(value))),
                Ok(value) if manifest.field(field.key()) != Some(&value) => {
                    problems.push(problem(ProblemKind::Invalid, Some(value)))
                }
                Ok(_) => {}
                Err(ConfigError::UmdNameNotSpecified { .. }) => {
                    problems.push(problem(ProblemKind::UmdNameNotSpecified, None))
                }
                Err(e) => return Err(e),
            }
        }
    }

    Ok(problems)
}
