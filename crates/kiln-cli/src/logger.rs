//! Logging setup for the kiln CLI.
//!
//! Library crates emit `tracing` events; this module installs the subscriber
//! that prints them.
//!
//! # Verbosity
//!
//! The filter is picked in this order:
//! 1. `--verbose`: DEBUG for the kiln crates
//! 2. `--quiet`: errors only
//! 3. `RUST_LOG`
//! 4. `log_level` from kiln.toml / `KILN_LOG_LEVEL`
//! 5. INFO for the kiln crates
//!
//! ```rust,no_run
//! use kiln_cli::logger::init_logger;
//! use tracing::info;
//!
//! init_logger(false, false, false, None);
//! info!("Starting build");
//! ```

use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

const KILN_CRATES: &[&str] = &["kiln", "kiln_bundler", "kiln_config", "kiln_cli"];

/// Install the global tracing subscriber.
///
/// Calling it twice is harmless; the second call is ignored.
pub fn init_logger(verbose: bool, quiet: bool, no_color: bool, configured_level: Option<&str>) {
    let filter = if verbose {
        EnvFilter::new(directives("debug"))
    } else if quiet {
        EnvFilter::new("error")
    } else {
        EnvFilter::try_from_default_env().unwrap_or_else(|_| {
            EnvFilter::try_new(directives(configured_level.unwrap_or("info")))
                .unwrap_or_else(|_| EnvFilter::new(directives("info")))
        })
    };

    let fmt_layer = fmt::layer()
        .with_target(false)
        .with_level(true)
        .with_ansi(!no_color)
        .with_writer(std::io::stderr)
        .compact();

    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt_layer)
        .try_init();
}

/// Filter directives enabling `level` for every kiln crate.
fn directives(level: &str) -> String {
    KILN_CRATES
        .iter()
        .map(|krate| format!("{krate}={level}"))
        .collect::<Vec<_>>()
        .join(",")
}
