//! Tracing initialisation.
//!
//! Filter precedence: `RUST_LOG`, then `MICROFEED_LOG_LEVEL`, then the CLI
//! verbosity. Output goes to stderr so the application owns stdout.

use tracing_subscriber::{prelude::*, EnvFilter};

use crate::config::env_keys::observability as keys;
use crate::config::{env_bool, env_optional};

/// Console verbosity requested on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Quiet,
    Normal,
    Debug,
    Trace,
}

impl Verbosity {
    pub fn from_flags(quiet: bool, verbose: u8) -> Self {
        match (quiet, verbose) {
            (true, _) => Self::Quiet,
            (false, 0) => Self::Normal,
            (false, 1) => Self::Debug,
            (false, _) => Self::Trace,
        }
    }

    fn directive(self) -> &'static str {
        match self {
            Self::Quiet => "microfeed_host=warn",
            Self::Normal => "microfeed_host=info",
            Self::Debug => "microfeed_host=debug",
            Self::Trace => "microfeed_host=trace",
        }
    }
}

pub fn init_tracing(verbosity: Verbosity) {
    let verbosity = if env_bool(keys::QUIET, false) {
        Verbosity::Quiet
    } else {
        verbosity
    };
    let level = env_optional(keys::LOG_LEVEL).unwrap_or_else(|| verbosity.directive().to_string());
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&level));

    let _ = if env_bool(keys::LOG_JSON, false) {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .json()
                    .with_writer(std::io::stderr)
                    .with_target(true),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                tracing_subscriber::fmt::layer()
                    .with_writer(std::io::stderr)
                    .with_target(false),
            )
            .try_init()
    };
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn flags_map_to_levels() {
        assert_eq!(Verbosity::from_flags(true, 2), Verbosity::Quiet);
        assert_eq!(Verbosity::from_flags(false, 0), Verbosity::Normal);
        assert_eq!(Verbosity::from_flags(false, 1), Verbosity::Debug);
        assert_eq!(Verbosity::from_flags(false, 5), Verbosity::Trace);
        assert_eq!(Verbosity::Normal.directive(), "microfeed_host=info");
    }
}
