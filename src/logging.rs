//! Logging setup for the `boq` binary.
//!
//! Library code logs through `tracing`; the binary installs a subscriber once
//! at startup. Logs go to stderr so command output on stdout stays pipeable.

use tracing::Level;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Environment variable that overrides the verbosity flags
pub const LOG_ENV: &str = "BOQ_LOG";

/// Verbosity level for diagnostic output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Verbosity {
    /// Errors only.
    Quiet,
    /// Warnings and errors.
    #[default]
    Normal,
    /// Debug output, `-v`.
    Verbose,
    /// Everything, `-vv`.
    Trace,
}

impl Verbosity {
    /// Map the `--quiet` flag and `-v` count onto a level
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Verbose,
            (false, _) => Self::Trace,
        }
    }

    #[must_use]
    pub fn to_level_filter(&self) -> Level {
        match self {
            Self::Quiet => Level::ERROR,
            Self::Normal => Level::WARN,
            Self::Verbose => Level::DEBUG,
            Self::Trace => Level::TRACE,
        }
    }
}

fn env_filter(verbosity: Verbosity) -> EnvFilter {
    let default_filter = format!("boq={}", verbosity.to_level_filter());
    EnvFilter::try_from_env(LOG_ENV)
        .or_else(|_| EnvFilter::try_from_default_env())
        .unwrap_or_else(|_| EnvFilter::new(default_filter))
}

/// Install the global subscriber. `BOQ_LOG`, then `RUST_LOG`, take
/// precedence over `verbosity`. Calling it twice is harmless.
pub fn init_logging(verbosity: Verbosity) {
    let subscriber = tracing_subscriber::registry().with(env_filter(verbosity)).with(
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(verbosity == Verbosity::Trace)
            .without_time(),
    );

    let _ = subscriber.try_init();
}
