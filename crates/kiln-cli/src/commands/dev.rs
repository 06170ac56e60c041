//! `kiln dev`: point every entrypoint's dist files at its source.

use crate::cli::ProjectArgs;
use crate::commands::utils;
use crate::error::Result;
use crate::ui;
use kiln_bundler::write_dev_files;
use kiln_config::resolve_project;

/// Execute the dev command.
///
/// Fields are validated strictly first; nothing is written when any package
/// is invalid.
pub async fn execute(args: ProjectArgs) -> Result<()> {
    let root = utils::resolve_directory(args.dir.as_deref())?;
    let project = resolve_project(&root)?;
    let packages = project.strict_packages()?;

    let files = tokio::task::spawn_blocking(move || write_dev_files(&packages))
        .await
        .map_err(|e| kiln_bundler::Error::Task(e.to_string()))??;

    for file in &files {
        tracing::debug!(file = %file.display(), "wrote dev file");
    }
    ui::success(&format!(
        "Wrote {} dev file{} for {} package{}",
        files.len(),
        if files.len() == 1 { "" } else { "s" },
        project.packages().len(),
        if project.packages().len() == 1 { "" } else { "s" },
    ));
    Ok(())
}
