//! Shared utilities for command implementations.
//!
//! - Project directory resolution
//! - Settings loading with CLI overrides
//! - Build coordinator assembly

use crate::error::{CliError, Result, ResultExt};
use figment::providers::Serialized;
use kiln_bundler::{
    BuildCoordinator, BuildResources, CommandInstaller, PackageManager, RolldownBundler,
};
use kiln_config::{Decision, Settings};
use serde::Serialize;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Resolve the `[DIR]` argument against the current directory.
///
/// # Errors
///
/// Returns [`CliError::FileNotFound`] when the directory does not exist.
pub fn resolve_directory(dir: Option<&Path>) -> Result<PathBuf> {
    let cwd = get_cwd()?;
    let dir = match dir {
        Some(dir) => resolve_path(dir, &cwd),
        None => cwd,
    };

    if !dir.exists() {
        return Err(CliError::FileNotFound(dir));
    }
    if !dir.is_dir() {
        return Err(CliError::InvalidArgument(format!(
            "{} is not a directory",
            dir.display()
        )));
    }

    Ok(dir)
}

/// Resolve a path relative to a working directory.
pub fn resolve_path(path: &Path, cwd: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        cwd.join(path)
    }
}

/// Get the current working directory.
pub fn get_cwd() -> Result<PathBuf> {
    std::env::current_dir().context("failed to get current directory")
}

/// Settings layers set from command-line flags. Unset flags are left out so
/// they don't mask kiln.toml or the environment.
#[derive(Debug, Default, Serialize)]
pub struct CliOverrides {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub parallel_builds: Option<usize>,
}

/// Load settings for the project at `root`, with `overrides` on top.
pub fn load_settings(root: &Path, overrides: CliOverrides) -> Result<Settings> {
    Ok(Settings::load_with(
        root,
        Serialized::defaults(overrides),
    )?)
}

/// Pick the package manager: the configured one, or whatever the lockfiles say.
pub fn package_manager(settings: &Settings, root: &Path) -> Result<PackageManager> {
    match settings.package_manager.as_deref() {
        Some(name) => name.parse::<PackageManager>().map_err(CliError::InvalidArgument).with_hint(
            "Set package_manager in kiln.toml to one of npm, yarn, pnpm or bun",
        ),
        None => Ok(PackageManager::detect(root)),
    }
}

/// Assemble a coordinator with the Rolldown backend and a command installer.
///
/// The returned resources must be disposed once the build is over.
pub fn coordinator(
    settings: &Settings,
    root: &Path,
    decision: Arc<dyn Decision>,
) -> Result<(BuildCoordinator, Arc<BuildResources>)> {
    let manager = package_manager(settings, root)?;
    tracing::debug!(%manager, "using package manager");

    let resources = Arc::new(BuildResources::new(settings.parallel_builds()));
    let coordinator = BuildCoordinator::new(
        Arc::new(RolldownBundler::new()),
        decision,
        Arc::new(CommandInstaller::new(manager)),
        Arc::clone(&resources),
    );

    #[cfg(feature = "dts-generation")]
    let coordinator =
        coordinator.with_declarations(Arc::new(kiln_bundler::IsolatedDeclarations::new()));

    Ok((coordinator, resources))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_resolve_path_relative_and_absolute() {
        let cwd = Path::new("/work");
        assert_eq!(resolve_path(Path::new("pkg"), cwd), PathBuf::from("/work/pkg"));
        assert_eq!(resolve_path(Path::new("/abs"), cwd), PathBuf::from("/abs"));
    }

    #[test]
    fn test_resolve_directory_missing() {
        let dir = TempDir::new().unwrap();
        let missing = dir.path().join("nope");
        let err = resolve_directory(Some(&missing)).unwrap_err();
        assert!(matches!(err, CliError::FileNotFound(p) if p == missing));
    }

    #[test]
    fn test_resolve_directory_rejects_files() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("package.json");
        fs::write(&file, "{}").unwrap();
        assert!(matches!(
            resolve_directory(Some(&file)),
            Err(CliError::InvalidArgument(_))
        ));
    }

    #[test]
    fn test_cli_override_wins_over_file() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("kiln.toml"), "parallel_builds = 8\n").unwrap();

        let settings = load_settings(dir.path(), CliOverrides::default()).unwrap();
        assert_eq!(settings.parallel_builds(), Some(8));

        let settings = load_settings(
            dir.path(),
            CliOverrides {
                parallel_builds: Some(2),
            },
        )
        .unwrap();
        assert_eq!(settings.parallel_builds(), Some(2));
    }

    #[test]
    fn test_configured_package_manager() {
        let dir = TempDir::new().unwrap();
        let settings = Settings {
            package_manager: Some("pnpm".to_string()),
            ..Settings::default()
        };
        assert_eq!(
            package_manager(&settings, dir.path()).unwrap(),
            PackageManager::Pnpm
        );

        let settings = Settings {
            package_manager: Some("pip".to_string()),
            ..Settings::default()
        };
        assert!(package_manager(&settings, dir.path()).is_err());
    }

    #[test]
    fn test_detected_package_manager() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("yarn.lock"), "").unwrap();
        assert_eq!(
            package_manager(&Settings::default(), dir.path()).unwrap(),
            PackageManager::Yarn
        );
    }
}
