//! kiln - build JavaScript and TypeScript packages and monorepos.

use clap::Parser;
use kiln_cli::cli::{Cli, Command};
use kiln_cli::{commands, error, logger, ui};
use kiln_config::Settings;
use miette::Result;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    let args = Cli::parse();

    let configured_level = configured_log_level(&args.command);
    logger::init_logger(
        args.verbose,
        args.quiet,
        args.no_color,
        configured_level.as_deref(),
    );
    ui::init_colors(args.no_color);
    ui::set_quiet(args.quiet);

    let yes = args.yes;
    let result = match args.command {
        Command::Init(project) => commands::init_execute(project, yes).await,
        Command::Build(build) => commands::build_execute(build, yes).await,
        Command::Dev(project) => commands::dev_execute(project).await,
        Command::Fix(project) => commands::fix_execute(project).await,
        Command::Validate(project) => commands::validate_execute(project).await,
        Command::Watch(build) => commands::watch_execute(build, yes).await,
    };

    result.map_err(error::cli_error_to_miette)
}

/// `log_level` from kiln.toml or the environment. Settings errors surface
/// later, when the command loads them for real.
fn configured_log_level(command: &Command) -> Option<String> {
    let dir = match command {
        Command::Build(args) | Command::Watch(args) => args.project.dir.as_deref(),
        Command::Init(args) | Command::Dev(args) | Command::Fix(args) | Command::Validate(args) => {
            args.dir.as_deref()
        }
    };
    let dir = dir.unwrap_or_else(|| Path::new("."));
    Settings::load(dir).ok().and_then(|s| s.log_level)
}
