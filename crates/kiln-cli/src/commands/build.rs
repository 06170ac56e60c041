//! `kiln build`: build every entrypoint of the project.

use crate::cli::BuildArgs;
use crate::commands::utils::{self, CliOverrides};
use crate::error::Result;
use crate::{prompt, ui};
use kiln_bundler::BuildReport;
use kiln_config::{Package, Settings, resolve_project};
use std::path::Path;

/// Execute the build command.
///
/// 1. Load settings (flags > env > kiln.toml > defaults)
/// 2. Resolve the project and its packages
/// 3. Build every entrypoint, asking questions as the coordinator needs them
/// 4. Print the summary
pub async fn execute(args: BuildArgs, yes: bool) -> Result<()> {
    let root = utils::resolve_directory(args.project.dir.as_deref())?;
    let settings = utils::load_settings(
        &root,
        CliOverrides {
            parallel_builds: args.parallel.map(usize::from),
        },
    )?;

    let project = resolve_project(&root)?;
    let report = build_packages(project.into_packages(), &settings, &root, yes).await?;

    ui::print_build_summary(&report, &root);
    ui::success(&format!(
        "Build completed in {}",
        ui::format_duration(report.elapsed)
    ));
    Ok(())
}

/// Build `packages` with a fresh coordinator behind a spinner.
///
/// Shared with `kiln watch`, which rebuilds one package at a time.
pub(crate) async fn build_packages(
    packages: Vec<Package>,
    settings: &Settings,
    root: &Path,
    yes: bool,
) -> Result<BuildReport> {
    let label = match packages.as_slice() {
        [package] => package.name().to_string(),
        _ => format!("{} packages", packages.len()),
    };
    let spinner = ui::Spinner::new(&format!("Building {label}"));

    let decision = prompt::decision(yes, Some(spinner.progress_bar()));
    let (coordinator, resources) = utils::coordinator(settings, root, decision)?;

    let result = coordinator.build(packages).await;
    resources.dispose();

    match result {
        Ok(report) => {
            spinner.finish(&format!(
                "Built {label} ({} file{})",
                report.files.len(),
                if report.files.len() == 1 { "" } else { "s" }
            ));
            Ok(report)
        }
        Err(e) => {
            spinner.clear();
            Err(e.into())
        }
    }
}
