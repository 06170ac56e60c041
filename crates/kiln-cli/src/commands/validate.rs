//! `kiln validate`: report every manifest problem.

use crate::cli::ProjectArgs;
use crate::commands::utils;
use crate::error::{CliError, Result};
use crate::ui;
use kiln_config::{resolve_project, validate_package};

/// Execute the validate command.
///
/// Prints every problem of every package before failing, unlike `build`
/// which stops at the first.
pub async fn execute(args: ProjectArgs) -> Result<()> {
    let root = utils::resolve_directory(args.dir.as_deref())?;
    let project = resolve_project(&root)?;

    let mut problems = 0;
    for package in project.packages() {
        for problem in validate_package(package)? {
            problems += 1;
            ui::error(&problem.to_string());
            ui::info(&format!("  {}", problem.hint()));
        }
    }

    if problems > 0 {
        return Err(CliError::Validation { problems });
    }

    let count = project.packages().len();
    ui::success(&format!(
        "{count} package{} valid",
        if count == 1 { " is" } else { "s are" }
    ));
    Ok(())
}
