//! Build variant configuration.
//!
//! [`build_configs`] turns one strict entrypoint into the list of bundler
//! invocations needed to produce its files:
//!
//! | Variant    | When               | Outputs                                         |
//! |------------|--------------------|-------------------------------------------------|
//! | node-dev   | always             | `<name>.cjs.dev.js`, `<name>.esm.js` with module |
//! | node-prod  | always             | `<name>.cjs.prod.js`                            |
//! | umd        | `umd:main` is set  | `<name>.umd.min.js`                             |
//! | browser    | `browser` is set   | `<name>.browser.cjs.js`, `<name>.browser.esm.js` with module |

use std::fmt;
use std::path::PathBuf;
use std::sync::Arc;

use kiln_config::{AliasMap, StrictEntrypoint, StrictPackage};

use crate::Result;
use crate::externals::{Externals, compute_externals};
use crate::resources::BuildResources;
use crate::target::RuntimeEnvironment;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Variant {
    NodeDev,
    NodeProd,
    Umd,
    Browser,
}

impl fmt::Display for Variant {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Variant::NodeDev => "node-dev",
            Variant::NodeProd => "node-prod",
            Variant::Umd => "umd",
            Variant::Browser => "browser",
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputFormat {
    Cjs,
    Es,
    Umd,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportMode {
    /// Named exports only; default export becomes `exports.default`.
    Named,
    /// Let the bundler pick based on the entry's exports.
    Auto,
}

/// One output file rendered from a bundle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputDescriptor {
    pub format: OutputFormat,
    /// Absolute path of the entry file.
    pub file: PathBuf,
    pub exports: ExportMode,
    /// Global variable name for UMD builds.
    pub global_name: Option<String>,
    pub minify: bool,
}

/// Plugin behaviour requested for a variant.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PluginChain {
    /// Report undeclared bare imports instead of bundling them.
    pub detect_missing_dependencies: bool,
    /// Fail imports that resolve outside the package directory.
    pub check_containment: bool,
    /// Literal replacements applied to the generated code, in order.
    pub replacements: Vec<(String, String)>,
}

#[derive(Debug, Clone)]
pub struct BuildVariantConfig {
    pub variant: Variant,
    pub package: String,
    pub package_directory: PathBuf,
    pub input: PathBuf,
    pub environment: RuntimeEnvironment,
    pub externals: Arc<Externals>,
    pub aliases: Arc<AliasMap>,
    /// Dependencies bundled into this variant (UMD only); they resolve normally.
    pub bundled_dependencies: Vec<String>,
    pub plugins: PluginChain,
    pub outputs: Vec<OutputDescriptor>,
}

impl BuildVariantConfig {
    /// Apply the variant's replacements to generated code.
    pub fn apply_replacements(&self, code: &str) -> String {
        self.plugins
            .replacements
            .iter()
            .fold(code.to_string(), |code, (from, to)| code.replace(from, to))
    }
}

fn production() -> (String, String) {
    (
        "process.env.NODE_ENV".to_string(),
        "\"production\"".to_string(),
    )
}

fn browser_globals() -> Vec<(String, String)> {
    vec![
        ("typeof window".to_string(), "\"object\"".to_string()),
        ("typeof document".to_string(), "\"object\"".to_string()),
    ]
}

/// Compute every build variant for `entrypoint` of `package`.
///
/// # Errors
///
/// Fails when a dependency manifest needed for the externals walk is missing.
pub fn build_configs(
    package: &StrictPackage,
    entrypoint: &StrictEntrypoint,
    aliases: Arc<AliasMap>,
    resources: &BuildResources,
) -> Result<Vec<BuildVariantConfig>> {
    let manifest = package.manifest();
    let node_externals = Arc::new(compute_externals(
        package.name(),
        manifest,
        RuntimeEnvironment::Node,
        false,
        resources,
    )?);

    let base = |variant, environment, externals: &Arc<Externals>, plugins, outputs| {
        BuildVariantConfig {
            variant,
            package: package.name().to_string(),
            package_directory: package.directory().to_path_buf(),
            input: entrypoint.source.clone(),
            environment,
            externals: Arc::clone(externals),
            aliases: Arc::clone(&aliases),
            bundled_dependencies: Vec::new(),
            plugins,
            outputs,
        }
    };

    let output = |format, suffix: &str, exports| OutputDescriptor {
        format,
        file: entrypoint.output_path(suffix),
        exports,
        global_name: None,
        minify: false,
    };

    let checks = PluginChain {
        detect_missing_dependencies: true,
        check_containment: true,
        replacements: Vec::new(),
    };

    let mut configs = Vec::with_capacity(4);

    let mut dev_outputs = vec![output(OutputFormat::Cjs, "cjs.dev.js", ExportMode::Named)];
    if entrypoint.module.is_some() {
        dev_outputs.push(output(OutputFormat::Es, "esm.js", ExportMode::Named));
    }
    configs.push(base(
        Variant::NodeDev,
        RuntimeEnvironment::Node,
        &node_externals,
        checks.clone(),
        dev_outputs,
    ));

    configs.push(base(
        Variant::NodeProd,
        RuntimeEnvironment::Node,
        &node_externals,
        PluginChain {
            replacements: vec![production()],
            ..checks.clone()
        },
        vec![output(OutputFormat::Cjs, "cjs.prod.js", ExportMode::Named)],
    ));

    if entrypoint.umd_main.is_some() {
        let umd_externals = Arc::new(compute_externals(
            package.name(),
            manifest,
            RuntimeEnvironment::Browser,
            true,
            resources,
        )?);
        let mut config = base(
            Variant::Umd,
            RuntimeEnvironment::Browser,
            &umd_externals,
            PluginChain {
                replacements: vec![production()],
                ..checks.clone()
            },
            vec![OutputDescriptor {
                global_name: entrypoint.umd_name.clone(),
                minify: true,
                ..output(OutputFormat::Umd, "umd.min.js", ExportMode::Auto)
            }],
        );
        config.bundled_dependencies = manifest
            .dependencies()
            .into_iter()
            .map(str::to_string)
            .collect();
        configs.push(config);
    }

    if entrypoint.browser {
        let mut outputs = vec![output(OutputFormat::Cjs, "browser.cjs.js", ExportMode::Named)];
        if entrypoint.module.is_some() {
            outputs.push(output(OutputFormat::Es, "browser.esm.js", ExportMode::Named));
        }
        let browser_externals = Arc::new(compute_externals(
            package.name(),
            manifest,
            RuntimeEnvironment::Browser,
            false,
            resources,
        )?);
        configs.push(base(
            Variant::Browser,
            RuntimeEnvironment::Browser,
            &browser_externals,
            PluginChain {
                replacements: browser_globals(),
                ..checks
            },
            outputs,
        ));
    }

    Ok(configs)
}
