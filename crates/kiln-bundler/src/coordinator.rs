//! Build coordination.
//!
//! Every entrypoint is built by its own task. A task runs [`Attempt`]s in a
//! loop: an attempt either produces all files of the entrypoint, fails, or
//! stops on a question that has to be answered before it can be retried
//! (a missing dependency that can be installed, or browser globals in a
//! package without a `browser` field). Answering yes changes the package on
//! disk, and the next attempt starts from the refreshed manifest.
//!
//! The first fatal error aborts every other task.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use kiln_config::fields::{self, Field, FieldContext};
use kiln_config::{AliasMap, Decision, Package, Question, StrictEntrypoint, StrictPackage};
use tokio::sync::{Mutex, OnceCell};
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::bundler::{BundleWarning, Bundler, OutputFile, WarningKind};
use crate::config::{BuildVariantConfig, OutputFormat, Variant, build_configs};
use crate::dts::DeclarationGenerator;
use crate::installer::{InstallRequest, PackageInstaller};
use crate::other_files::other_files;
use crate::resources::BuildResources;
use crate::writer::write_outputs;
use crate::{Error, Result};

/// Outcome of one build attempt of an entrypoint.
#[derive(Debug)]
pub enum Attempt {
    Built(Vec<OutputFile>),
    NeedsDecision(PendingDecision),
    Fatal(Error),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PendingDecision {
    /// `dependency` was imported but not declared; `install` is the package
    /// that provides it.
    MissingDependency { dependency: String, install: String },
    /// The dev bundle references browser globals but `browser` is unset.
    BrowserField,
}

#[derive(Debug, Clone, Default)]
pub struct BuildReport {
    pub packages: usize,
    pub entrypoints: usize,
    pub files: Vec<PathBuf>,
    pub elapsed: Duration,
}

/// Shared, per-package state of one build.
struct PackageState {
    name: String,
    package: Mutex<Package>,
    browser_decision: OnceCell<bool>,
}

#[derive(Clone)]
pub struct BuildCoordinator {
    bundler: Arc<dyn Bundler>,
    decision: Arc<dyn Decision>,
    installer: Arc<dyn PackageInstaller>,
    declarations: Option<Arc<dyn DeclarationGenerator>>,
    resources: Arc<BuildResources>,
}

impl BuildCoordinator {
    pub fn new(
        bundler: Arc<dyn Bundler>,
        decision: Arc<dyn Decision>,
        installer: Arc<dyn PackageInstaller>,
        resources: Arc<BuildResources>,
    ) -> Self {
        Self {
            bundler,
            decision,
            installer,
            declarations: None,
            resources,
        }
    }

    /// Generate `.d.ts` files for TypeScript entrypoints with `generator`.
    pub fn with_declarations(mut self, generator: Arc<dyn DeclarationGenerator>) -> Self {
        self.declarations = Some(generator);
        self
    }

    pub fn resources(&self) -> &Arc<BuildResources> {
        &self.resources
    }

    /// Build every entrypoint of `packages` and write the results.
    ///
    /// # Errors
    ///
    /// The first fatal error of any entrypoint. Packages that fail validation
    /// are reported before anything is built.
    pub async fn build(&self, packages: Vec<Package>) -> Result<BuildReport> {
        let started = Instant::now();

        let strict = packages
            .iter()
            .map(Package::strict)
            .collect::<kiln_config::Result<Vec<StrictPackage>>>()?;
        let aliases = Arc::new(kiln_config::aliases(&strict));

        let mut report = BuildReport {
            packages: packages.len(),
            ..Default::default()
        };

        let mut tasks = JoinSet::new();
        for package in packages {
            let entrypoints = package.entrypoints().len();
            report.entrypoints += entrypoints;
            let state = Arc::new(PackageState {
                name: package.name().to_string(),
                package: Mutex::new(package),
                browser_decision: OnceCell::new(),
            });

            for index in 0..entrypoints {
                let this = self.clone();
                let state = Arc::clone(&state);
                let aliases = Arc::clone(&aliases);
                tasks.spawn(async move { this.build_entrypoint(&state, index, &aliases).await });
            }
        }

        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Ok(files)) => report.files.extend(files),
                Ok(Err(error)) => {
                    tasks.abort_all();
                    return Err(error);
                }
                Err(error) if error.is_cancelled() => {}
                Err(error) => {
                    tasks.abort_all();
                    return Err(Error::Task(error.to_string()));
                }
            }
        }

        report.elapsed = started.elapsed();
        info!(
            packages = report.packages,
            entrypoints = report.entrypoints,
            files = report.files.len(),
            elapsed_ms = report.elapsed.as_millis() as u64,
            "build finished"
        );
        Ok(report)
    }

    async fn build_entrypoint(
        &self,
        state: &PackageState,
        index: usize,
        aliases: &Arc<AliasMap>,
    ) -> Result<Vec<PathBuf>> {
        let (entrypoint, dist) = {
            let package = state.package.lock().await;
            let entrypoint = &package.entrypoints()[index];
            (entrypoint.import_name().to_string(), entrypoint.dist_directory())
        };
        info!(package = %state.name, entrypoint = %entrypoint, "building");

        loop {
            match self.attempt(state, index, aliases).await {
                Attempt::Built(files) => {
                    let written = tokio::task::spawn_blocking(move || write_outputs(&dist, &files))
                        .await
                        .map_err(|e| Error::Task(e.to_string()))??;
                    info!(
                        package = %state.name,
                        entrypoint = %entrypoint,
                        files = written.len(),
                        "built"
                    );
                    return Ok(written);
                }
                Attempt::Fatal(error) => return Err(error),
                Attempt::NeedsDecision(PendingDecision::MissingDependency {
                    dependency,
                    install,
                }) => {
                    self.install_dependency(state, &dependency, install).await?;
                }
                Attempt::NeedsDecision(PendingDecision::BrowserField) => {
                    let accepted = *state
                        .browser_decision
                        .get_or_try_init(|| self.add_browser_field(state))
                        .await?;
                    if !accepted {
                        return Err(Error::BrowserGlobalsWithoutBrowserField {
                            package: state.name.clone(),
                        });
                    }
                }
            }
            debug!(package = %state.name, entrypoint = %entrypoint, "retrying");
        }
    }

    /// Run one build attempt of the entrypoint at `index`.
    async fn attempt(&self, state: &PackageState, index: usize, aliases: &Arc<AliasMap>) -> Attempt {
        match self.try_attempt(state, index, aliases).await {
            Ok(attempt) => attempt,
            Err(error) => Attempt::Fatal(error),
        }
    }

    async fn try_attempt(
        &self,
        state: &PackageState,
        index: usize,
        aliases: &Arc<AliasMap>,
    ) -> Result<Attempt> {
        let strict = state.package.lock().await.strict()?;
        let Some(entry) = strict.entrypoints().get(index).cloned() else {
            return Err(Error::Task(format!(
                "{}: entrypoint {index} disappeared",
                state.name
            )));
        };

        let configs = build_configs(&strict, &entry, Arc::clone(aliases), &self.resources)?;
        let mut files = Vec::new();

        for config in &configs {
            let _permit = self.resources.acquire_worker().await?;
            debug!(package = %state.name, variant = %config.variant, "bundling");

            let mut bundle = self.bundler.bundle(config).await?;
            for output in &config.outputs {
                let generated = bundle.generate(output).await?;

                for warning in &generated.warnings {
                    if let Some(attempt) = interpret_warning(&strict, warning) {
                        return Ok(attempt);
                    }
                }

                if needs_browser_field(config, &entry, output.format, &generated.files) {
                    return Ok(Attempt::NeedsDecision(PendingDecision::BrowserField));
                }

                files.extend(generated.files);
            }
        }

        files.extend(other_files(strict.name(), &entry, self.declarations.as_deref()).await?);
        Ok(Attempt::Built(files))
    }

    async fn install_dependency(
        &self,
        state: &PackageState,
        dependency: &str,
        install: String,
    ) -> Result<()> {
        let _permit = self.resources.acquire_install().await?;
        let mut package = state.package.lock().await;

        // Another entrypoint of this package may have installed it while this
        // one waited for the permit.
        if package.manifest().has_dependency(&install) {
            debug!(package = %state.name, install = %install, "already installed");
            return Ok(());
        }

        let question = Question::InstallDependency {
            package: state.name.clone(),
            dependency: install.clone(),
        };
        if !self.decision.confirm(&question).await? {
            return Err(Error::MissingDependency {
                package: state.name.clone(),
                dependency: install,
            });
        }

        warn!(package = %state.name, dependency, install = %install, "installing missing dependency");
        self.installer
            .install(&InstallRequest {
                packages: vec![install],
                cwd: package.directory().to_path_buf(),
            })
            .await?;
        package.refresh()?;
        Ok(())
    }

    async fn add_browser_field(&self, state: &PackageState) -> Result<bool> {
        let question = Question::BrowserField {
            package: state.name.clone(),
        };
        if !self.decision.confirm(&question).await? {
            return Ok(false);
        }

        let mut package = state.package.lock().await;
        for index in 0..package.entrypoints().len() {
            let name = package.name().to_string();
            let manifest = package.entrypoint_manifest_mut(index);
            let ctx = FieldContext::new(&name, manifest)?;
            fields::fix(Field::Browser, &ctx, manifest)?;
        }
        package.save()?;
        warn!(package = %state.name, "added browser field");
        Ok(true)
    }
}

/// The package providing a recoverable missing import.
fn recoverable_install(specifier: &str) -> Option<&'static str> {
    if specifier == "object-assign" {
        Some("object-assign")
    } else if specifier.starts_with("@babel/runtime/helpers/") {
        Some("@babel/runtime")
    } else {
        None
    }
}

/// What a bundler warning means for the attempt; `None` when it can be ignored.
fn interpret_warning(package: &StrictPackage, warning: &BundleWarning) -> Option<Attempt> {
    if warning.kind.is_ignored() {
        debug!(package = %package.name(), kind = %warning.kind, "ignoring warning");
        return None;
    }

    let name = package.name().to_string();
    let specifier = warning.specifier.clone().unwrap_or_default();
    let importer = warning.importer.clone().unwrap_or_default();

    let attempt = match warning.kind {
        WarningKind::UnresolvedImport => match recoverable_install(&specifier) {
            Some(install) if !package.manifest().has_dependency(install) => {
                Attempt::NeedsDecision(PendingDecision::MissingDependency {
                    dependency: specifier,
                    install: install.to_string(),
                })
            }
            _ => Attempt::Fatal(Error::UndeclaredDependency {
                package: name,
                specifier,
                importer,
            }),
        },
        WarningKind::ImportOutsidePackage => Attempt::Fatal(Error::ImportOutsidePackage {
            package: name,
            specifier,
            importer,
        }),
        _ => Attempt::Fatal(Error::Bundler {
            package: name,
            message: warning.message.clone(),
        }),
    };
    Some(attempt)
}

fn needs_browser_field(
    config: &BuildVariantConfig,
    entry: &StrictEntrypoint,
    format: OutputFormat,
    files: &[OutputFile],
) -> bool {
    config.variant == Variant::NodeDev
        && format == OutputFormat::Cjs
        && !entry.browser
        && files
            .iter()
            .any(|f| f.code.contains("typeof window") || f.code.contains("typeof document"))
}
