//! Diagnostic logging setup for the `dds-verify` binary.
//!
//! The library only emits `tracing` events; the binary installs a compact
//! `tracing-subscriber` writer on stderr. `RUST_LOG` takes precedence over
//! the verbosity flag.

use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Filter directive for a `-v` count: 0 → warn, 1 → info, 2 → debug, more → trace.
pub fn level_for_verbosity(verbosity: u8) -> &'static str {
    match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    }
}

/// Install the global subscriber. Later calls are ignored.
pub fn init_logging(verbosity: u8) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(level_for_verbosity(verbosity)));

    let subscriber = tracing_subscriber::registry().with(filter).with(
        fmt::layer()
            .compact()
            .with_target(false)
            .with_writer(std::io::stderr),
    );

    // Ignore error if subscriber was already set
    let _ = tracing::subscriber::set_global_default(subscriber);
}
