//! Package and entrypoint discovery.
//!
//! A root directory is either a single package or, when its manifest lists
//! `kiln.packages` globs, a monorepo whose packages are the matching
//! directories that hold a `package.json`.

use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use path_clean::PathClean;
use tracing::debug;

use crate::error::{ConfigError, Result};
use crate::manifest::{MANIFEST_FILE, Manifest};
use crate::package::{Entrypoint, Package, Project, StrictPackage};

/// Extensions tried, in order, for `<entrypoint>/src/index`.
pub const SOURCE_EXTENSIONS: &[&str] = &["js", "jsx", "ts", "tsx"];

/// Import name to absolute entrypoint source path.
pub type AliasMap = IndexMap<String, PathBuf>;

/// Resolve the project rooted at `root`.
///
/// # Errors
///
/// Any manifest or entrypoint resolution failure of any package.
pub fn resolve_project(root: impl AsRef<Path>) -> Result<Project> {
    let root = absolute(root.as_ref())?;
    let manifest = Manifest::load(&root)?;
    let config = manifest.tool_config()?;

    if config.packages.is_empty() {
        debug!(root = %root.display(), "resolving single package");
        let package = resolve_package(manifest.clone())?;
        return Ok(Project {
            root: manifest,
            packages: vec![package],
            monorepo: false,
        });
    }

    let directories = expand_package_globs(&root, &config.packages)?;
    debug!(
        root = %root.display(),
        count = directories.len(),
        "resolving monorepo packages"
    );

    let packages = directories
        .into_iter()
        .map(|dir| Manifest::load(&dir).and_then(resolve_package))
        .collect::<Result<Vec<_>>>()?;

    Ok(Project {
        root: manifest,
        packages,
        monorepo: true,
    })
}

fn expand_package_globs(root: &Path, patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut directories = Vec::new();

    for pattern in patterns {
        let full = root.join(pattern);
        let matches = glob::glob(&full.to_string_lossy()).map_err(|e| ConfigError::InvalidGlob {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;

        for entry in matches {
            let path = entry.map_err(|e| ConfigError::Io(e.into_error()))?;
            if path.is_dir() && path.join(MANIFEST_FILE).is_file() {
                directories.push(path.clean());
            }
        }
    }

    directories.sort();
    directories.dedup();
    Ok(directories)
}

/// Resolve the entrypoints of the package described by `manifest`.
pub fn resolve_package(manifest: Manifest) -> Result<Package> {
    let name = manifest
        .name()
        .ok_or_else(|| ConfigError::MissingName(manifest.directory().to_path_buf()))?
        .to_string();
    let entrypoints = resolve_entrypoints(&name, &manifest)?;
    debug!(package = %name, entrypoints = entrypoints.len(), "resolved package");
    Ok(Package {
        name,
        manifest,
        entrypoints,
    })
}

/// Resolve the entrypoints listed in `kiln.entrypoints`, defaulting to `"."`.
///
/// # Errors
///
/// - [`ConfigError::NoSource`] when `<entrypoint>/src/index.*` does not exist
/// - [`ConfigError::EntrypointOutsidePackageDirectory`] when the source
///   escapes the package directory
/// - [`ConfigError::NoEntrypointManifest`] when a non-root entrypoint has no
///   `package.json`
pub fn resolve_entrypoints(package_name: &str, manifest: &Manifest) -> Result<Vec<Entrypoint>> {
    let config = manifest.tool_config()?;
    let names = if config.entrypoints.is_empty() {
        vec![".".to_string()]
    } else {
        config.entrypoints.iter().map(|e| normalize(e)).collect()
    };

    let package_dir = manifest.directory();
    names
        .into_iter()
        .map(|name| resolve_entrypoint(package_name, package_dir, name))
        .collect()
}

fn normalize(entrypoint: &str) -> String {
    let trimmed = entrypoint.trim_start_matches("./").trim_end_matches('/');
    if trimmed.is_empty() {
        ".".to_string()
    } else {
        trimmed.to_string()
    }
}

fn resolve_entrypoint(package_name: &str, package_dir: &Path, name: String) -> Result<Entrypoint> {
    let is_root = name == ".";
    let directory = if is_root {
        package_dir.to_path_buf()
    } else {
        package_dir.join(&name).clean()
    };

    let source = find_source(&directory).ok_or_else(|| ConfigError::NoSource {
        package: package_name.to_string(),
        entrypoint: name.clone(),
    })?;

    let canonical_source = source.canonicalize()?;
    let canonical_dir = package_dir.canonicalize()?;
    if !canonical_source.starts_with(&canonical_dir) {
        return Err(ConfigError::EntrypointOutsidePackageDirectory {
            package: package_name.to_string(),
            source_path: canonical_source,
            directory: canonical_dir,
        });
    }

    let manifest = if is_root {
        None
    } else {
        match Manifest::load(&directory) {
            Ok(manifest) => Some(manifest),
            Err(ConfigError::NoManifest(_)) => {
                return Err(ConfigError::NoEntrypointManifest {
                    package: package_name.to_string(),
                    entrypoint: name,
                });
            }
            Err(e) => return Err(e),
        }
    };

    let import_name = if is_root {
        package_name.to_string()
    } else {
        format!("{package_name}/{name}")
    };

    Ok(Entrypoint {
        name,
        import_name,
        directory,
        source,
        manifest,
    })
}

fn find_source(directory: &Path) -> Option<PathBuf> {
    SOURCE_EXTENSIONS
        .iter()
        .map(|ext| directory.join("src").join(format!("index.{ext}")))
        .find(|candidate| candidate.is_file())
}

fn absolute(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        Ok(path.to_path_buf().clean())
    } else {
        Ok(std::env::current_dir()?.join(path).clean())
    }
}

/// Map every entrypoint import name to its source file, so sibling packages
/// resolve to source rather than a stale `dist`.
pub fn aliases(packages: &[StrictPackage]) -> AliasMap {
    packages
        .iter()
        .flat_map(|p| p.entrypoints())
        .map(|e| (e.import_name.clone(), e.source.clone()))
        .collect()
}
