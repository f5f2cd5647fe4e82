//! Environment variable names. Each one mirrors a command-line flag.

pub const PYTHON: &str = "MICROFEED_PYTHON";
pub const VENV_DIR: &str = "MICROFEED_VENV_DIR";
pub const REQUIREMENTS: &str = "MICROFEED_REQUIREMENTS";
pub const ENTRY: &str = "MICROFEED_ENTRY";
pub const WORKDIR: &str = "MICROFEED_WORKDIR";
pub const CONFIG: &str = "MICROFEED_CONFIG";

/// Logging
pub mod observability {
    pub const QUIET: &str = "MICROFEED_QUIET";
    pub const LOG_LEVEL: &str = "MICROFEED_LOG_LEVEL";
    pub const LOG_JSON: &str = "MICROFEED_LOG_JSON";
}
