//! Miette rendering for CLI errors.

use crate::error::CliError;
use kiln_config::ConfigError;
use miette::Report;

/// Convert a [`CliError`] into a miette report for `main` to print.
pub fn cli_error_to_miette(err: CliError) -> Report {
    match err {
        CliError::Build(e) => bundler_error_to_miette(e),
        CliError::Config(e) => config_error_to_miette(e),
        CliError::Validation { .. } => miette::miette!(
            help = "Run `kiln fix` to repair the fields automatically, or `kiln init` to be asked about each one.",
            "{}",
            err
        ),
        _ => miette::miette!("{}", err),
    }
}

fn bundler_error_to_miette(err: kiln_bundler::Error) -> Report {
    match err {
        kiln_bundler::Error::Config(e) => config_error_to_miette(e),
        // The Diagnostic impl on the bundler error carries code and help.
        other => Report::new(other),
    }
}

fn config_error_to_miette(err: ConfigError) -> Report {
    match &err {
        ConfigError::InvalidField { .. } | ConfigError::MissingField { .. } => miette::miette!(
            code = "CONFIG_ERROR",
            help = "Run `kiln fix` to repair the field.",
            "{}",
            err
        ),
        ConfigError::NoManifest(_) => miette::miette!(
            code = "CONFIG_ERROR",
            help = "Pass the directory of a package or monorepo root, e.g. `kiln build path/to/project`.",
            "{}",
            err
        ),
        _ => miette::miette!(code = "CONFIG_ERROR", "{}", err),
    }
}
