//! `kiln fix`: repair invalid fields without asking.

use crate::cli::ProjectArgs;
use crate::commands::{init::print_report, utils};
use crate::error::Result;
use crate::ui;
use kiln_config::resolve_project;

/// Execute the fix command.
///
/// Fails when a package is still invalid afterwards, e.g. `umd:main` without
/// a `kiln.umdName`.
pub async fn execute(args: ProjectArgs) -> Result<()> {
    let root = utils::resolve_directory(args.dir.as_deref())?;
    let mut project = resolve_project(&root)?;

    let report = kiln_config::fix(&mut project).await?;
    print_report(&report);

    project.strict_packages()?;
    ui::success("All package.json files are valid");
    Ok(())
}
