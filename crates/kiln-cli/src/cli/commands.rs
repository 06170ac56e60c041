use clap::{Args, Subcommand};
use std::path::PathBuf;

/// Available kiln subcommands
#[derive(Subcommand, Debug)]
pub enum Command {
    /// Set up package.json fields for kiln
    ///
    /// Asks, per package, whether to set or fix main, module, umd:main,
    /// browser and types, and in monorepos whether to add a postinstall
    /// script running `kiln dev`.
    Init(ProjectArgs),

    /// Build every entrypoint
    ///
    /// Produces the dev, prod, ES module, UMD and browser builds each
    /// entrypoint's fields ask for, plus declarations for TypeScript.
    Build(BuildArgs),

    /// Write dist files that redirect to the sources
    ///
    /// Lets packages of a monorepo import each other without building.
    Dev(ProjectArgs),

    /// Repair invalid package.json fields without asking
    Fix(ProjectArgs),

    /// Check every package.json and report problems
    Validate(ProjectArgs),

    /// Build, then rebuild packages whose files change
    Watch(BuildArgs),
}

/// Arguments shared by every command
#[derive(Args, Debug, Clone, Default)]
pub struct ProjectArgs {
    /// Project directory (defaults to the current directory)
    #[arg(value_name = "DIR")]
    pub dir: Option<PathBuf>,
}

/// Arguments for the build and watch commands
#[derive(Args, Debug, Clone, Default)]
pub struct BuildArgs {
    #[command(flatten)]
    pub project: ProjectArgs,

    /// Maximum number of bundler jobs running at once
    ///
    /// Overrides `parallel_builds` from kiln.toml and KILN_PARALLEL_BUILDS.
    /// Defaults to the number of CPUs.
    #[arg(short = 'j', long, value_name = "N", value_parser = clap::value_parser!(u16).range(1..))]
    pub parallel: Option<u16>,
}
