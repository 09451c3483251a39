//! Public SDK surface for reprise.
//!
//! This crate re-exports the replay building blocks and provides the logging
//! setup and command implementations used by the `reprise` binary.

pub mod cli;

/// Re-export for convenience.
pub use reprise_config as config;
/// Re-export for convenience.
pub use reprise_core as engine;
/// Re-export for convenience.
pub use reprise_history as history;
/// Re-export for convenience.
pub use reprise_match as matching;

/// Initialize `env_logger`, honoring `RUST_LOG` when set.
///
/// `verbosity` raises the default filter: 0 is `warn`, 1 `info`, 2 `debug`,
/// anything higher `trace`. Repeated calls are ignored.
pub fn init_logging(verbosity: u8) {
    let default_filter = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };
    let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_filter))
        .format_timestamp_millis()
        .try_init();
}
