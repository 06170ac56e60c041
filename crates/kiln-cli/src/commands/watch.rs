//! `kiln watch`: build once, then rebuild packages as their files change.

use crate::cli::BuildArgs;
use crate::commands::build::build_packages;
use crate::commands::utils::{self, CliOverrides};
use crate::error::{CliError, Result, cli_error_to_miette};
use crate::ui;
use crate::watcher::{DEFAULT_DEBOUNCE, FileWatcher};
use kiln_config::{MANIFEST_FILE, Package, Project, Settings, resolve_project};
use std::collections::{BTreeSet, HashMap};
use std::fs;
use std::path::{Path, PathBuf};
use tokio::signal;
use tokio::sync::mpsc;

/// Execute the watch command.
///
/// Build failures are printed and watching continues; only setup errors and
/// watcher failures end the command.
pub async fn execute(args: BuildArgs, yes: bool) -> Result<()> {
    let root = utils::resolve_directory(args.project.dir.as_deref())?;
    let settings = utils::load_settings(
        &root,
        CliOverrides {
            parallel_builds: args.parallel.map(usize::from),
        },
    )?;

    let project = resolve_project(&root)?;
    let roots = watch_roots(&project);
    let manifest_paths = manifest_paths(project.packages());

    if let Err(e) = build_packages(project.into_packages(), &settings, &root, yes).await {
        report(e);
    }
    let mut manifests = Manifests::default();
    manifests.capture(manifest_paths);

    let (watcher, mut changes) = FileWatcher::new(roots, DEFAULT_DEBOUNCE)?;
    ui::info(&format!(
        "Watching {} package director{} for changes (Ctrl+C to stop)",
        watcher.roots().len(),
        if watcher.roots().len() == 1 { "y" } else { "ies" }
    ));

    loop {
        tokio::select! {
            changed = changes.recv() => {
                let Some(first) = changed else {
                    return Err(CliError::Custom("file watcher stopped unexpectedly".to_string()));
                };
                let paths = collect_burst(first, &mut changes).await;
                rebuild(&paths, &settings, &root, yes, &mut manifests).await;
            }
            _ = signal::ctrl_c() => {
                ui::info("Stopping watch");
                break;
            }
        }
    }

    Ok(())
}

/// Every package directory, without duplicates.
fn watch_roots(project: &Project) -> Vec<PathBuf> {
    project
        .packages()
        .iter()
        .map(|p| p.directory().to_path_buf())
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// Every `package.json` of `packages` and their entrypoints.
fn manifest_paths(packages: &[Package]) -> Vec<PathBuf> {
    packages
        .iter()
        .flat_map(|p| {
            std::iter::once(p.directory().join(MANIFEST_FILE))
                .chain(p.entrypoints().iter().map(|e| e.directory().join(MANIFEST_FILE)))
        })
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

/// `package.json` contents as of the last build. Builds write manifests
/// themselves (installs, the `browser` field); those writes must not trigger
/// another rebuild.
#[derive(Debug, Default)]
struct Manifests(HashMap<PathBuf, String>);

impl Manifests {
    fn capture(&mut self, paths: Vec<PathBuf>) {
        for path in paths {
            match fs::read_to_string(&path) {
                Ok(contents) => {
                    self.0.insert(path, contents);
                }
                Err(_) => {
                    self.0.remove(&path);
                }
            }
        }
    }

    /// Whether `path` is a manifest still holding what the last build left.
    fn unchanged(&self, path: &Path) -> bool {
        self.0
            .get(path)
            .is_some_and(|known| fs::read_to_string(path).is_ok_and(|now| &now == known))
    }
}

/// Gather the changes that arrive shortly after `first`, so a save touching
/// several files triggers one rebuild.
async fn collect_burst(first: PathBuf, changes: &mut mpsc::Receiver<PathBuf>) -> Vec<PathBuf> {
    tokio::time::sleep(DEFAULT_DEBOUNCE).await;
    let mut paths = vec![first];
    while let Ok(path) = changes.try_recv() {
        paths.push(path);
    }
    paths
}

/// Re-resolve the project and rebuild the packages owning `paths`.
async fn rebuild(
    paths: &[PathBuf],
    settings: &Settings,
    root: &Path,
    yes: bool,
    manifests: &mut Manifests,
) {
    let paths: Vec<PathBuf> = paths
        .iter()
        .filter(|path| !manifests.unchanged(path))
        .cloned()
        .collect();
    if paths.is_empty() {
        tracing::debug!("only manifests written by the last build changed");
        return;
    }

    // Manifests may have changed, so entrypoints are resolved again.
    let project = match resolve_project(root) {
        Ok(project) => project,
        Err(e) => {
            report(e.into());
            return;
        }
    };

    let owners = owning_packages(&project, &paths);
    if owners.is_empty() {
        tracing::debug!(?paths, "changes outside every known package");
        return;
    }

    for path in &paths {
        tracing::debug!(path = %path.display(), "changed");
    }

    let packages: Vec<Package> = project
        .into_packages()
        .into_iter()
        .filter(|p| owners.contains(p.name()))
        .collect();
    let rebuilt = manifest_paths(&packages);

    if let Err(e) = build_packages(packages, settings, root, yes).await {
        report(e);
    }
    manifests.capture(rebuilt);
}

fn owning_packages(project: &Project, paths: &[PathBuf]) -> BTreeSet<String> {
    paths
        .iter()
        .filter_map(|path| project.package_for_path(path))
        .map(|package| package.name().to_string())
        .collect()
}

fn report(err: CliError) {
    eprintln!("{:?}", cli_error_to_miette(err));
}
