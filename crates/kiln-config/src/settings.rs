//! Process-level settings shared by every command.
//!
//! Layered with figment: defaults, then `kiln.toml` at the project root, then
//! `KILN_*` environment variables, then whatever the caller merges last
//! (CLI flags).

use std::path::Path;

use figment::{
    Figment, Provider,
    providers::{Env, Format as _, Serialized, Toml},
};
use serde::{Deserialize, Serialize};

use crate::error::{ConfigError, Result};

pub const SETTINGS_FILE: &str = "kiln.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Settings {
    /// Upper bound on concurrently running bundler jobs. `None` uses the CPU count.
    #[serde(default)]
    pub parallel_builds: Option<usize>,

    /// Package manager used to install missing dependencies. Detected from
    /// lockfiles when unset.
    #[serde(default)]
    pub package_manager: Option<String>,

    #[serde(default)]
    pub log_level: Option<String>,
}

impl Settings {
    /// Load settings for the project at `root`.
    pub fn load(root: &Path) -> Result<Self> {
        Self::figment(root).extract().map_err(settings_error)
    }

    /// Load settings with `overrides` taking precedence over every other layer.
    pub fn load_with<P: Provider>(root: &Path, overrides: P) -> Result<Self> {
        Self::figment(root)
            .merge(overrides)
            .extract()
            .map_err(settings_error)
    }

    fn figment(root: &Path) -> Figment {
        let mut figment = Figment::new().merge(Serialized::defaults(Settings::default()));

        let file = root.join(SETTINGS_FILE);
        if file.is_file() {
            figment = figment.merge(Toml::file(file));
        }

        figment.merge(Env::prefixed("KILN_"))
    }

    pub fn parallel_builds(&self) -> Option<usize> {
        self.parallel_builds.filter(|n| *n > 0)
    }
}

fn settings_error(e: figment::Error) -> ConfigError {
    ConfigError::Settings(e.to_string())
}
