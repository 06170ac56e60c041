//! `kiln init`: ask about and fix manifest fields.

use crate::cli::ProjectArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::{prompt, ui};
use kiln_config::{InitReport, resolve_project};

/// Execute the init command.
pub async fn execute(args: ProjectArgs, yes: bool) -> Result<()> {
    let root = utils::resolve_directory(args.dir.as_deref())?;
    let mut project = resolve_project(&root)?;

    let decision = prompt::decision(yes, None);
    let report = kiln_config::init(&mut project, decision.as_ref()).await?;

    print_report(&report);
    ui::success(if project.is_monorepo() {
        "Monorepo is set up for kiln"
    } else {
        "Package is set up for kiln"
    });
    Ok(())
}

/// List the fields an init or fix run wrote.
pub(crate) fn print_report(report: &InitReport) {
    if report.is_empty() {
        ui::info("No changes needed");
        return;
    }
    for (package, entrypoint, field) in &report.fixed {
        if entrypoint == "." {
            ui::info(&format!("{package}: set `{field}`"));
        } else {
            ui::info(&format!("{package}/{entrypoint}: set `{field}`"));
        }
    }
    if report.postinstall_added {
        ui::info("Added `\"postinstall\": \"kiln dev\"` to the root package.json");
    }
}
