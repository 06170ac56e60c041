//! Yes/no decisions requested from the user.
//!
//! The orchestrators never talk to a terminal directly. They describe what
//! they want to do as a [`Question`] and ask a [`Decision`] implementation;
//! the CLI supplies an interactive one, tests and `--yes` supply fixed ones.

use std::fmt;

use async_trait::async_trait;

use crate::error::Result;
use crate::fields::Field;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Question {
    /// Set or repair a manifest field.
    FixField {
        package: String,
        entrypoint: String,
        field: Field,
        expected: String,
        missing: bool,
    },
    /// Add a `postinstall` script running `kiln dev` to a monorepo root.
    Postinstall { root: String },
    /// Install a dependency the build needs but the manifest lacks.
    InstallDependency { package: String, dependency: String },
    /// Add a `browser` field because the code references browser globals.
    BrowserField { package: String },
}

impl Question {
    pub fn package(&self) -> Option<&str> {
        match self {
            Question::FixField { package, .. }
            | Question::InstallDependency { package, .. }
            | Question::BrowserField { package } => Some(package),
            Question::Postinstall { .. } => None,
        }
    }
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Question::FixField {
                package,
                entrypoint,
                field,
                expected,
                missing,
            } => {
                let location = if entrypoint == "." {
                    package.clone()
                } else {
                    format!("{package}/{entrypoint}")
                };
                match (field, missing) {
                    (Field::Module, true) => write!(
                        f,
                        "would you like to generate ES module builds for {location}? (`module` will be set to {expected})"
                    ),
                    (Field::Types, true) => write!(
                        f,
                        "{location} has TypeScript sources, add a `types` field set to {expected}?"
                    ),
                    (_, true) => write!(
                        f,
                        "{location} has no `{field}` field, set it to {expected}?"
                    ),
                    (_, false) => write!(
                        f,
                        "`{field}` in {location} is invalid, change it to {expected}?"
                    ),
                }
            }
            Question::Postinstall { root } => write!(
                f,
                "add `\"postinstall\": \"kiln dev\"` to {root} so packages resolve to source after install?"
            ),
            Question::InstallDependency {
                package,
                dependency,
            } => write!(
                f,
                "{package} needs {dependency} but it is not in dependencies, install it?"
            ),
            Question::BrowserField { package } => write!(
                f,
                "{package} checks `typeof window` or `typeof document`, add a `browser` field so browser builds are generated?"
            ),
        }
    }
}

/// Answers yes/no questions. Implementations may block on user input.
#[async_trait]
pub trait Decision: Send + Sync {
    async fn confirm(&self, question: &Question) -> Result<bool>;
}

/// Answers yes to everything (`--yes`, `kiln fix`).
#[derive(Debug, Clone, Copy, Default)]
pub struct AlwaysConfirm;

#[async_trait]
impl Decision for AlwaysConfirm {
    async fn confirm(&self, _question: &Question) -> Result<bool> {
        Ok(true)
    }
}

/// Answers no to everything.
#[derive(Debug, Clone, Copy, Default)]
pub struct NeverConfirm;

#[async_trait]
impl Decision for NeverConfirm {
    async fn confirm(&self, _question: &Question) -> Result<bool> {
        Ok(false)
    }
}
