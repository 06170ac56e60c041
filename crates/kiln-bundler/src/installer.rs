//! Installing missing dependencies through the project's package manager.

use std::fmt;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use std::str::FromStr;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::{Error, Result};

/// Packages to add as dependencies of the package in `cwd`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    pub packages: Vec<String>,
    pub cwd: PathBuf,
}

#[async_trait]
pub trait PackageInstaller: Send + Sync {
    async fn install(&self, request: &InstallRequest) -> Result<()>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PackageManager {
    #[default]
    Npm,
    Yarn,
    Pnpm,
    Bun,
}

impl PackageManager {
    /// Detect the package manager from lock files in `dir` or its ancestors.
    ///
    /// `pnpm-lock.yaml` wins over `yarn.lock`, which wins over `bun.lockb`;
    /// npm is the fallback.
    pub fn detect(dir: &Path) -> Self {
        for dir in dir.ancestors() {
            if dir.join("pnpm-lock.yaml").exists() {
                return PackageManager::Pnpm;
            } else if dir.join("yarn.lock").exists() {
                return PackageManager::Yarn;
            } else if dir.join("bun.lockb").exists() {
                return PackageManager::Bun;
            } else if dir.join("package-lock.json").exists() {
                return PackageManager::Npm;
            }
        }
        PackageManager::Npm
    }

    pub fn command(&self) -> &'static str {
        match self {
            PackageManager::Npm => "npm",
            PackageManager::Yarn => "yarn",
            PackageManager::Pnpm => "pnpm",
            PackageManager::Bun => "bun",
        }
    }

    /// Subcommand adding a package to `dependencies`.
    pub fn add_subcommand(&self) -> &'static str {
        match self {
            PackageManager::Npm => "install",
            PackageManager::Yarn | PackageManager::Pnpm | PackageManager::Bun => "add",
        }
    }
}

impl fmt::Display for PackageManager {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.command())
    }
}

impl FromStr for PackageManager {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "npm" => Ok(PackageManager::Npm),
            "yarn" => Ok(PackageManager::Yarn),
            "pnpm" => Ok(PackageManager::Pnpm),
            "bun" => Ok(PackageManager::Bun),
            other => Err(format!(
                "unknown package manager \"{other}\", expected npm, yarn, pnpm or bun"
            )),
        }
    }
}

/// Runs `<manager> add <packages>` as a child process.
#[derive(Debug, Clone)]
pub struct CommandInstaller {
    manager: PackageManager,
}

impl CommandInstaller {
    pub fn new(manager: PackageManager) -> Self {
        Self { manager }
    }

    pub fn detect(dir: &Path) -> Self {
        Self::new(PackageManager::detect(dir))
    }

    pub fn manager(&self) -> PackageManager {
        self.manager
    }
}

#[async_trait]
impl PackageInstaller for CommandInstaller {
    async fn install(&self, request: &InstallRequest) -> Result<()> {
        let packages = request.packages.join(" ");
        info!(
            manager = %self.manager,
            packages = %packages,
            cwd = %request.cwd.display(),
            "installing dependencies"
        );

        let output = Command::new(self.manager.command())
            .arg(self.manager.add_subcommand())
            .args(&request.packages)
            .current_dir(&request.cwd)
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| Error::Install {
                packages: packages.clone(),
                cwd: request.cwd.clone(),
                message: format!("failed to run {}: {e}", self.manager),
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(Error::Install {
                packages,
                cwd: request.cwd.clone(),
                message: format!("{} exited with {}: {}", self.manager, output.status, stderr.trim()),
            });
        }

        debug!(packages = %packages, "install finished");
        Ok(())
    }
}
