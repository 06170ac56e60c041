//! Interactive `init` and non-interactive `fix` flows.
//!
//! Both walk every package, compute which fields are missing or drifted and
//! ask a [`Decision`] before changing anything. Accepted changes are applied
//! in memory and saved once per package.

use serde_json::Value;
use tracing::{debug, info};

use crate::error::{ConfigError, Result};
use crate::fields::{self, Field, FieldContext};
use crate::manifest::Manifest;
use crate::package::{Package, Project};
use crate::prompt::{AlwaysConfirm, Decision, Question};

pub const POSTINSTALL_SCRIPT: &str = "kiln dev";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    /// Offer every missing or invalid field.
    Init,
    /// Repair present fields (and `main`), never add optional ones.
    Fix,
}

/// What an init or fix run changed.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct InitReport {
    /// `(package, entrypoint, field)` for every field written.
    pub fixed: Vec<(String, String, Field)>,
    pub saved_packages: Vec<String>,
    pub postinstall_added: bool,
}

impl InitReport {
    pub fn is_empty(&self) -> bool {
        self.fixed.is_empty() && !self.postinstall_added
    }
}

/// Run the interactive flow over every package of `project`.
pub async fn init(project: &mut Project, decision: &dyn Decision) -> Result<InitReport> {
    run(project, decision, Mode::Init).await
}

/// Repair every invalid field without asking.
pub async fn fix(project: &mut Project) -> Result<InitReport> {
    run(project, &AlwaysConfirm, Mode::Fix).await
}

async fn run(project: &mut Project, decision: &dyn Decision, mode: Mode) -> Result<InitReport> {
    let mut report = InitReport::default();

    for package in project.packages_mut() {
        let fixed = init_package(package, decision, mode).await?;
        if !fixed.is_empty() {
            package.save()?;
            info!(package = %package.name(), fields = fixed.len(), "updated manifest");
            report.saved_packages.push(package.name().to_string());
            report.fixed.extend(fixed);
        }
    }

    if mode == Mode::Init && project.is_monorepo() {
        let root = project.root_mut();
        if root.script("postinstall") != Some(POSTINSTALL_SCRIPT) {
            let question = Question::Postinstall {
                root: root.path().display().to_string(),
            };
            if decision.confirm(&question).await? {
                root.set_script("postinstall", POSTINSTALL_SCRIPT);
                root.save()?;
                report.postinstall_added = true;
            }
        }
    }

    Ok(report)
}

/// Ask about every field of every entrypoint of `package`, in field order.
///
/// Returns the fields that were changed. Nothing is written to disk.
pub async fn init_package(
    package: &mut Package,
    decision: &dyn Decision,
    mode: Mode,
) -> Result<Vec<(String, String, Field)>> {
    let mut fixed = Vec::new();
    let name = package.name().to_string();
    let typescript = package.is_typescript();

    for index in 0..package.entrypoints().len() {
        let entrypoint = package.entrypoints()[index].name().to_string();

        for field in Field::ALL {
            let manifest = package.entrypoint_manifest_mut(index);
            // Rebuilt per field: `browser` depends on whether `module` was just added.
            let ctx = FieldContext::new(&name, manifest)?;
            let present = manifest.field(field.key()).is_some();

            if !should_ask(field, present, typescript, mode) {
                continue;
            }
            if present && fields::is_valid(field, &ctx, manifest)? {
                continue;
            }

            let expected = fields::expected(field, &ctx)?;
            let question = Question::FixField {
                package: name.clone(),
                entrypoint: entrypoint.clone(),
                field,
                expected: display_value(&expected),
                missing: !present,
            };

            if decision.confirm(&question).await? {
                let manifest = package.entrypoint_manifest_mut(index);
                apply(manifest, field, expected);
                debug!(package = %name, entrypoint = %entrypoint, %field, "fixed field");
                fixed.push((name.clone(), entrypoint.clone(), field));
            } else if field == Field::Main {
                return Err(ConfigError::MainFieldDeclined { package: name });
            }
        }
    }

    Ok(fixed)
}

fn should_ask(field: Field, present: bool, typescript: bool, mode: Mode) -> bool {
    match (field, mode) {
        (Field::Main, _) => true,
        (Field::Module, Mode::Init) => true,
        (Field::Types, Mode::Init) => present || typescript,
        _ => present,
    }
}

fn apply(manifest: &mut Manifest, field: Field, value: Value) {
    manifest.set_field(field.key(), value);
}

fn display_value(value: &Value) -> String {
    match value {
        Value::String(s) => format!("\"{s}\""),
        other => other.to_string(),
    }
}
