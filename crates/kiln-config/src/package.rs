//! Packages, entrypoints and their validated (strict) views.

use std::path::{Path, PathBuf};

use crate::error::Result;
use crate::fields::{self, Field, file_base};
use crate::manifest::Manifest;

/// One public import path of a package, backed by one source file.
#[derive(Debug, Clone, PartialEq)]
pub struct Entrypoint {
    pub(crate) name: String,
    pub(crate) import_name: String,
    pub(crate) directory: PathBuf,
    pub(crate) source: PathBuf,
    /// `None` for the root entrypoint, whose fields live in the package manifest.
    pub(crate) manifest: Option<Manifest>,
}

impl Entrypoint {
    /// Relative name: `"."` for the package root, `"foo"` otherwise.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Specifier consumers import: `@scope/pkg` or `@scope/pkg/foo`.
    pub fn import_name(&self) -> &str {
        &self.import_name
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    pub fn source(&self) -> &Path {
        &self.source
    }

    pub fn is_root(&self) -> bool {
        self.manifest.is_none()
    }

    pub fn is_typescript(&self) -> bool {
        matches!(
            self.source.extension().and_then(|e| e.to_str()),
            Some("ts" | "tsx")
        )
    }

    pub fn dist_directory(&self) -> PathBuf {
        self.directory.join("dist")
    }
}

/// A manifest plus the entrypoints resolved for it.
#[derive(Debug, Clone, PartialEq)]
pub struct Package {
    pub(crate) name: String,
    pub(crate) manifest: Manifest,
    pub(crate) entrypoints: Vec<Entrypoint>,
}

impl Package {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn directory(&self) -> &Path {
        self.manifest.directory()
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn manifest_mut(&mut self) -> &mut Manifest {
        &mut self.manifest
    }

    pub fn entrypoints(&self) -> &[Entrypoint] {
        &self.entrypoints
    }

    /// The manifest holding the output fields of `entrypoint`.
    pub fn entrypoint_manifest<'a>(&'a self, entrypoint: &'a Entrypoint) -> &'a Manifest {
        entrypoint.manifest.as_ref().unwrap_or(&self.manifest)
    }

    /// Mutable access to the manifest of the entrypoint at `index`.
    pub fn entrypoint_manifest_mut(&mut self, index: usize) -> &mut Manifest {
        match self
            .entrypoints
            .get_mut(index)
            .and_then(|e| e.manifest.as_mut())
        {
            Some(manifest) => manifest,
            None => &mut self.manifest,
        }
    }

    pub fn is_typescript(&self) -> bool {
        self.entrypoints.iter().any(Entrypoint::is_typescript)
    }

    /// Persist the package manifest and every entrypoint manifest.
    pub fn save(&self) -> Result<()> {
        self.manifest.save()?;
        for manifest in self.entrypoints.iter().filter_map(|e| e.manifest.as_ref()) {
            manifest.save()?;
        }
        Ok(())
    }

    /// Re-read every manifest of the package from disk.
    pub fn refresh(&mut self) -> Result<()> {
        self.manifest.refresh()?;
        for manifest in self.entrypoints.iter_mut().filter_map(|e| e.manifest.as_mut()) {
            manifest.refresh()?;
        }
        Ok(())
    }

    /// Validate the package and freeze it into a [`StrictPackage`].
    ///
    /// # Errors
    ///
    /// The first missing or invalid field, as a [`crate::ConfigError`].
    pub fn strict(&self) -> Result<StrictPackage> {
        if let Some(problem) = fields::validate_package(self)?.into_iter().next() {
            return Err(problem.into_error());
        }

        let entrypoints = self
            .entrypoints
            .iter()
            .map(|entrypoint| -> Result<StrictEntrypoint> {
                let manifest = self.entrypoint_manifest(entrypoint);
                let string = |field: Field| manifest.string_field(field.key()).map(str::to_string);
                Ok(StrictEntrypoint {
                    name: entrypoint.name.clone(),
                    import_name: entrypoint.import_name.clone(),
                    directory: entrypoint.directory.clone(),
                    source: entrypoint.source.clone(),
                    file_base: file_base(&self.name).to_string(),
                    main: string(Field::Main).unwrap_or_default(),
                    module: string(Field::Module),
                    umd_main: string(Field::UmdMain),
                    umd_name: manifest.tool_config()?.umd_name,
                    browser: manifest.field(Field::Browser.key()).is_some(),
                    types: string(Field::Types),
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(StrictPackage {
            package: self.clone(),
            entrypoints,
        })
    }
}

/// Validated entrypoint: `main` is present and every present optional field
/// holds its expected value.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StrictEntrypoint {
    pub name: String,
    pub import_name: String,
    pub directory: PathBuf,
    pub source: PathBuf,
    /// Package name without scope; every output file starts with it.
    pub file_base: String,
    pub main: String,
    pub module: Option<String>,
    pub umd_main: Option<String>,
    pub umd_name: Option<String>,
    pub browser: bool,
    pub types: Option<String>,
}

impl StrictEntrypoint {
    pub fn dist_directory(&self) -> PathBuf {
        self.directory.join("dist")
    }

    /// Path of an output file, e.g. `output_path("cjs.dev.js")`.
    pub fn output_path(&self, suffix: &str) -> PathBuf {
        self.dist_directory()
            .join(format!("{}.{suffix}", self.file_base))
    }

    pub fn is_typescript(&self) -> bool {
        matches!(
            self.source.extension().and_then(|e| e.to_str()),
            Some("ts" | "tsx")
        )
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StrictPackage {
    package: Package,
    entrypoints: Vec<StrictEntrypoint>,
}

impl StrictPackage {
    pub fn name(&self) -> &str {
        self.package.name()
    }

    pub fn directory(&self) -> &Path {
        self.package.directory()
    }

    pub fn manifest(&self) -> &Manifest {
        self.package.manifest()
    }

    pub fn entrypoints(&self) -> &[StrictEntrypoint] {
        &self.entrypoints
    }

    pub fn package(&self) -> &Package {
        &self.package
    }
}

/// A root manifest and the packages resolved under it.
#[derive(Debug, Clone, PartialEq)]
pub struct Project {
    pub(crate) root: Manifest,
    pub(crate) packages: Vec<Package>,
    pub(crate) monorepo: bool,
}

impl Project {
    pub fn root(&self) -> &Manifest {
        &self.root
    }

    pub fn root_mut(&mut self) -> &mut Manifest {
        &mut self.root
    }

    pub fn directory(&self) -> &Path {
        self.root.directory()
    }

    pub fn packages(&self) -> &[Package] {
        &self.packages
    }

    pub fn packages_mut(&mut self) -> &mut [Package] {
        &mut self.packages
    }

    pub fn into_packages(self) -> Vec<Package> {
        self.packages
    }

    pub fn is_monorepo(&self) -> bool {
        self.monorepo
    }

    /// The package whose directory contains `path`, deepest match first.
    pub fn package_for_path(&self, path: &Path) -> Option<&Package> {
        self.packages
            .iter()
            .filter(|p| path.starts_with(p.directory()))
            .max_by_key(|p| p.directory().components().count())
    }

    /// Strict views of every package, failing on the first invalid one.
    pub fn strict_packages(&self) -> Result<Vec<StrictPackage>> {
        self.packages.iter().map(Package::strict).collect()
    }
}
