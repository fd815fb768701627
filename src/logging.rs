//! Logging setup
//!
//! Diagnostics about the run itself go through `tracing` to stderr. The
//! default level is `warn`, so a normal run logs nothing and the report on
//! stdout/stderr is all the user sees.

use tracing_subscriber::{EnvFilter, fmt, prelude::*};

pub const DEFAULT_LEVEL: &str = "warn";
pub const VERBOSE_LEVEL: &str = "debug";

/// Filter directive for the given verbosity. `RUST_LOG` takes precedence.
pub fn level_for(verbose: bool) -> &'static str {
    if verbose { VERBOSE_LEVEL } else { DEFAULT_LEVEL }
}

/// Install the global subscriber. Safe to call more than once.
pub fn init(verbose: bool) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level_for(verbose)));

    let layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_ansi(atty::is(atty::Stream::Stderr))
        .with_target(false);

    // Fails only if a subscriber is already installed
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(layer)
        .try_init();
}
