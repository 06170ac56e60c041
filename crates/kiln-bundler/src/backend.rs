//! Rolldown-backed [`Bundler`].
//!
//! Externals, entrypoint aliases, missing-dependency detection and the
//! containment check all live in one `resolve_id` plugin. The plugin never
//! fails the build: problems are recorded as [`BundleWarning`]s and the
//! offending import is left external, so the coordinator sees every problem
//! of an attempt and decides what to do with it.

use std::borrow::Cow;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use path_clean::PathClean;
use rolldown::{BundlerBuilder as RolldownBundlerBuilder, BundlerOptions, InputItem};
use rolldown_common::{Output, OutputExports, ResolvedExternal};
use rolldown_error::EventKind;
use rolldown_plugin::{
    __inner::SharedPluginable, HookResolveIdArgs, HookResolveIdOutput, HookResolveIdReturn,
    HookUsage, Plugin, PluginContext,
};
use rustc_hash::FxHashSet;
use tracing::debug;

use crate::bundler::{Bundle, BundleWarning, Bundler, GeneratedOutput, OutputFile, WarningKind};
use crate::config::{BuildVariantConfig, ExportMode, OutputDescriptor, OutputFormat};
use crate::externals::{is_bare, package_name};
use crate::target::RuntimeEnvironment;
use crate::{Error, Result};

#[derive(Debug, Clone, Copy, Default)]
pub struct RolldownBundler;

impl RolldownBundler {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Bundler for RolldownBundler {
    async fn bundle(&self, config: &BuildVariantConfig) -> Result<Box<dyn Bundle>> {
        if !tokio::fs::try_exists(&config.input).await? {
            return Err(Error::Bundler {
                package: config.package.clone(),
                message: format!("entry {} does not exist", config.input.display()),
            });
        }
        Ok(Box::new(RolldownBundle {
            config: config.clone(),
        }))
    }
}

struct RolldownBundle {
    config: BuildVariantConfig,
}

#[async_trait]
impl Bundle for RolldownBundle {
    async fn generate(&mut self, output: &OutputDescriptor) -> Result<GeneratedOutput> {
        let config = &self.config;
        let recorder = Arc::new(Mutex::new(Vec::new()));
        let plugin: SharedPluginable = Arc::new(KilnResolvePlugin::new(config, Arc::clone(&recorder)));

        let options = BundlerOptions {
            input: Some(vec![InputItem {
                name: None,
                import: config.input.to_string_lossy().into_owned(),
            }]),
            cwd: Some(config.package_directory.clone()),
            format: Some(match output.format {
                OutputFormat::Cjs => rolldown::OutputFormat::Cjs,
                OutputFormat::Es => rolldown::OutputFormat::Esm,
                OutputFormat::Umd => rolldown::OutputFormat::Umd,
            }),
            platform: Some(match config.environment {
                RuntimeEnvironment::Node => rolldown::Platform::Node,
                RuntimeEnvironment::Browser => rolldown::Platform::Browser,
            }),
            name: output.global_name.clone(),
            exports: Some(match output.exports {
                ExportMode::Named => OutputExports::Named,
                ExportMode::Auto => OutputExports::Auto,
            }),
            minify: output.minify.then(|| rolldown::RawMinifyOptions::from(true)),
            ..Default::default()
        };

        let mut bundler = RolldownBundlerBuilder::default()
            .with_options(options)
            .with_plugins(vec![plugin])
            .build()
            .map_err(|e| bundler_error(&config.package, &e))?;

        let bundle = bundler
            .generate()
            .await
            .map_err(|e| bundler_error(&config.package, &e))?;

        let out_dir = output
            .file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default();

        let mut files = Vec::new();
        for item in &bundle.assets {
            if let Output::Chunk(chunk) = item {
                let path = if chunk.is_entry {
                    output.file.clone()
                } else {
                    out_dir.join(chunk.filename.as_str())
                };
                files.push(OutputFile::new(path, config.apply_replacements(&chunk.code)));
            }
        }

        let mut warnings: Vec<BundleWarning> = bundle
            .warnings
            .iter()
            .map(|w| classify_warning(w.kind(), w.to_string()))
            .collect();
        warnings.extend(recorder.lock().drain(..));

        debug!(
            package = %config.package,
            variant = %config.variant,
            files = files.len(),
            warnings = warnings.len(),
            "generated output"
        );

        Ok(GeneratedOutput { files, warnings })
    }
}

fn bundler_error(package: &str, error: &dyn std::fmt::Debug) -> Error {
    Error::Bundler {
        package: package.to_string(),
        message: format!("{error:?}"),
    }
}

/// Map a Rolldown diagnostic to a [`WarningKind`] by its event kind.
fn classify_warning(event: EventKind, message: String) -> BundleWarning {
    let kind = match event {
        EventKind::CircularDependency => WarningKind::CircularDependency,
        EventKind::UnresolvedImport => WarningKind::UnresolvedImport,
        other => WarningKind::Other(other.to_string()),
    };

    BundleWarning {
        kind,
        message,
        specifier: None,
        importer: None,
    }
}

/// Shared state of the resolve plugin for one generate call.
#[derive(Debug)]
struct ResolveState {
    package_directory: PathBuf,
    input: PathBuf,
    config: BuildVariantConfig,
    bundled: FxHashSet<String>,
    recorder: Arc<Mutex<Vec<BundleWarning>>>,
}

impl ResolveState {
    fn resolve(&self, specifier: &str, importer: Option<&str>) -> Option<HookResolveIdOutput> {
        let importer = importer?;
        if specifier.starts_with('\0') {
            return None;
        }

        // Modules of bundled dependencies follow their own rules.
        let importer_path = Path::new(importer);
        let own_module = importer_path.starts_with(&self.package_directory)
            && !importer_path
                .components()
                .any(|c| c.as_os_str() == "node_modules");

        if is_bare(specifier) {
            return self.resolve_bare(specifier, importer, own_module);
        }

        if self.config.plugins.check_containment && own_module {
            let base = importer_path.parent().unwrap_or(importer_path);
            let resolved = base.join(specifier).clean();
            if !resolved.starts_with(&self.package_directory) {
                self.recorder.lock().push(BundleWarning {
                    kind: WarningKind::ImportOutsidePackage,
                    message: format!(
                        "\"{specifier}\" resolves to {} which is outside {}",
                        resolved.display(),
                        self.package_directory.display()
                    ),
                    specifier: Some(specifier.to_string()),
                    importer: Some(importer.to_string()),
                });
                return Some(external(specifier));
            }
        }

        None
    }

    fn resolve_bare(
        &self,
        specifier: &str,
        importer: &str,
        own_module: bool,
    ) -> Option<HookResolveIdOutput> {
        let alias = self.config.aliases.get(specifier);

        // Other entrypoints of this package stay separate modules.
        if let Some(target) = alias {
            if target != &self.input && target.starts_with(&self.package_directory) {
                return Some(external(specifier));
            }
        }

        if self.config.externals.is_external(specifier) {
            return Some(external(specifier));
        }

        let declared = package_name(specifier).is_some_and(|name| self.bundled.contains(name));
        if declared || !own_module {
            // Bundled sibling packages are inlined from source, not their `dist`.
            return alias
                .map(|target| HookResolveIdOutput::from_id(target.to_string_lossy().into_owned()));
        }
        if !self.config.plugins.detect_missing_dependencies {
            return None;
        }

        self.recorder
            .lock()
            .push(BundleWarning::unresolved_import(specifier, importer));
        Some(external(specifier))
    }
}

fn external(specifier: &str) -> HookResolveIdOutput {
    HookResolveIdOutput {
        id: specifier.to_string().into(),
        external: Some(ResolvedExternal::Bool(true)),
        ..Default::default()
    }
}

/// Plugin deciding, per import, between external, bundled and reported.
#[derive(Debug, Clone)]
pub struct KilnResolvePlugin {
    state: Arc<ResolveState>,
}

impl KilnResolvePlugin {
    fn new(config: &BuildVariantConfig, recorder: Arc<Mutex<Vec<BundleWarning>>>) -> Self {
        Self {
            state: Arc::new(ResolveState {
                package_directory: config.package_directory.clone(),
                input: config.input.clone(),
                bundled: config.bundled_dependencies.iter().cloned().collect(),
                config: config.clone(),
                recorder,
            }),
        }
    }
}

impl Plugin for KilnResolvePlugin {
    fn name(&self) -> Cow<'static, str> {
        "kiln-resolve".into()
    }

    fn register_hook_usage(&self) -> HookUsage {
        HookUsage::ResolveId
    }

    fn resolve_id(
        &self,
        _ctx: &PluginContext,
        args: &HookResolveIdArgs,
    ) -> impl std::future::Future<Output = HookResolveIdReturn> + Send {
        let specifier = args.specifier.to_string();
        let importer = args.importer.map(|i| i.to_string());
        let state = Arc::clone(&self.state);

        async move { Ok(state.resolve(&specifier, importer.as_deref())) }
    }
}
