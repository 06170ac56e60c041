//! Command-line interface definition for kiln.
//!
//! # Command Structure
//!
//! - `kiln init` - Ask about and fix manifest fields
//! - `kiln build` - Build every entrypoint of the project
//! - `kiln dev` - Point `dist` files at the sources
//! - `kiln fix` - Repair invalid fields without asking
//! - `kiln validate` - Report manifest problems
//! - `kiln watch` - Build, then rebuild packages as their files change

mod commands;

use clap::Parser;

pub use commands::{BuildArgs, Command, ProjectArgs};

/// kiln - build JavaScript and TypeScript packages and monorepos
#[derive(Parser, Debug)]
#[command(
    name = "kiln",
    version,
    about = "Build JavaScript and TypeScript packages and monorepos",
    long_about = "kiln reads package.json files, keeps their main/module/umd:main/browser/types\n\
                  fields consistent and builds every entrypoint into CommonJS, ES module,\n\
                  UMD and browser bundles."
)]
pub struct Cli {
    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Suppress all output except errors
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,

    /// Disable colored output
    #[arg(long, global = true)]
    pub no_color: bool,

    /// Answer yes to every question
    ///
    /// Accepts field fixes, dependency installs and the browser field
    /// without prompting. Useful in CI.
    #[arg(short, long, global = true)]
    pub yes: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Command,
}
