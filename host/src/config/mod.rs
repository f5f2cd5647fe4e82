//! Launcher configuration.
//!
//! Layers, lowest to highest: built-in defaults, `launcher.toml`, environment
//! (including `.env`), command-line flags. Environment and flags arrive
//! together as [`Overrides`] since clap reads both.
//!
//! - `env_keys`: `MICROFEED_*` variable names
//! - `loader`: `.env` loading and typed env lookups

pub mod env_keys;
pub mod loader;

use std::ffi::OsString;
use std::path::{Path, PathBuf};

use serde::Deserialize;
use tracing::debug;

use crate::error::{LaunchError, Result};
use crate::interpreter;
use crate::venv::VenvLayout;

pub use loader::{env_bool, env_optional, load_dotenv};

pub const DEFAULT_VENV_DIR: &str = "venv";
pub const DEFAULT_REQUIREMENTS: &str = "requirements.txt";
pub const DEFAULT_ENTRY: &str = "microfeed.py";
pub const DEFAULT_CONFIG_FILE: &str = "launcher.toml";

/// Contents of `launcher.toml`. Every key is optional.
#[derive(Debug, Default, Clone, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields, rename_all = "kebab-case")]
pub struct FileConfig {
    pub python: Option<String>,
    pub venv_dir: Option<PathBuf>,
    pub requirements: Option<PathBuf>,
    pub entry: Option<PathBuf>,
    pub upgrade_pip: Option<bool>,
    pub app_args: Option<Vec<String>>,
}

impl FileConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| LaunchError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        toml::from_str(&text).map_err(|e| LaunchError::Config {
            path: path.to_path_buf(),
            message: e.message().to_string(),
        })
    }
}

/// Per-run values from the command line or its environment fallbacks.
#[derive(Debug, Default, Clone)]
pub struct Overrides {
    pub python: Option<String>,
    pub venv_dir: Option<PathBuf>,
    pub requirements: Option<PathBuf>,
    pub entry: Option<PathBuf>,
    pub workdir: Option<PathBuf>,
    pub config: Option<PathBuf>,
    pub recreate: bool,
    pub no_upgrade_pip: bool,
    pub app_args: Vec<OsString>,
}

/// Fully resolved settings for one run. All paths are absolute.
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub python_candidates: Vec<String>,
    pub workdir: PathBuf,
    pub venv_dir: PathBuf,
    pub requirements: PathBuf,
    pub entry: PathBuf,
    pub app_args: Vec<OsString>,
    pub recreate: bool,
    pub upgrade_pip: bool,
    pub layout: VenvLayout,
}

impl LauncherConfig {
    /// The bare-invocation behaviour: `venv`, `requirements.txt` and
    /// `microfeed.py` relative to `workdir`.
    pub fn defaults_in(workdir: impl Into<PathBuf>) -> Self {
        let workdir = workdir.into();
        Self {
            python_candidates: interpreter::default_candidates(),
            venv_dir: workdir.join(DEFAULT_VENV_DIR),
            requirements: workdir.join(DEFAULT_REQUIREMENTS),
            entry: workdir.join(DEFAULT_ENTRY),
            workdir,
            app_args: Vec::new(),
            recreate: false,
            upgrade_pip: true,
            layout: VenvLayout::native(),
        }
    }

    /// Resolve the working directory, read the config file if any, and apply
    /// the overrides on top.
    pub fn resolve(overrides: Overrides) -> Result<Self> {
        let cwd = std::env::current_dir().map_err(|e| LaunchError::Config {
            path: PathBuf::from("."),
            message: format!("cannot determine current directory: {e}"),
        })?;
        let workdir = match &overrides.workdir {
            Some(dir) => cwd.join(dir),
            None => cwd,
        };

        let file = match &overrides.config {
            Some(path) => Some(FileConfig::load(&workdir.join(path))?),
            None => {
                let default = workdir.join(DEFAULT_CONFIG_FILE);
                if default.is_file() {
                    Some(FileConfig::load(&default)?)
                } else {
                    None
                }
            }
        };

        let mut config = Self::defaults_in(workdir);
        if let Some(file) = file {
            debug!(?file, "applying config file");
            config.apply_file(file);
        }
        config.apply_overrides(overrides);
        Ok(config)
    }

    pub fn apply_file(&mut self, file: FileConfig) {
        if let Some(python) = file.python {
            self.python_candidates = vec![python];
        }
        if let Some(dir) = file.venv_dir {
            self.venv_dir = self.workdir.join(dir);
        }
        if let Some(path) = file.requirements {
            self.requirements = self.workdir.join(path);
        }
        if let Some(path) = file.entry {
            self.entry = self.workdir.join(path);
        }
        if let Some(upgrade) = file.upgrade_pip {
            self.upgrade_pip = upgrade;
        }
        if let Some(args) = file.app_args {
            self.app_args = args.into_iter().map(OsString::from).collect();
        }
    }

    pub fn apply_overrides(&mut self, overrides: Overrides) {
        if let Some(python) = overrides.python {
            self.python_candidates = vec![python];
        }
        if let Some(dir) = overrides.venv_dir {
            self.venv_dir = self.workdir.join(dir);
        }
        if let Some(path) = overrides.requirements {
            self.requirements = self.workdir.join(path);
        }
        if let Some(path) = overrides.entry {
            self.entry = self.workdir.join(path);
        }
        if !overrides.app_args.is_empty() {
            self.app_args = overrides.app_args;
        }
        self.recreate |= overrides.recreate;
        if overrides.no_upgrade_pip {
            self.upgrade_pip = false;
        }
    }
}
