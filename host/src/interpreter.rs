//! Host interpreter discovery.

use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::error::{LaunchError, Result};
use crate::process::{Invocation, ProcessRunner};

/// Names tried, in order, when no interpreter is configured.
pub fn default_candidates() -> Vec<String> {
    let names: &[&str] = if cfg!(windows) {
        &["python", "py", "python3"]
    } else {
        &["python3", "python"]
    };
    names.iter().map(|s| s.to_string()).collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct PythonVersion {
    pub major: u32,
    pub minor: u32,
    pub patch: u32,
}

impl PythonVersion {
    /// Parse the output of `python --version`, e.g. `Python 3.12.1`.
    ///
    /// Pre-release suffixes (`3.13.0rc1`) are ignored; a missing patch is 0.
    pub fn parse(text: &str) -> Option<Self> {
        let rest = text.trim().strip_prefix("Python")?.trim();
        let version = rest.split_whitespace().next()?;
        let mut parts = version.split('.');
        let major = leading_number(parts.next()?)?;
        let minor = leading_number(parts.next()?)?;
        let patch = parts.next().and_then(leading_number).unwrap_or(0);
        Some(Self {
            major,
            minor,
            patch,
        })
    }

    /// The `venv` module ships with Python 3.3 and later.
    pub fn supports_venv(&self) -> bool {
        (self.major, self.minor) >= (3, 3)
    }
}

fn leading_number(part: &str) -> Option<u32> {
    let digits: String = part.chars().take_while(char::is_ascii_digit).collect();
    digits.parse().ok()
}

impl fmt::Display for PythonVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}.{}", self.major, self.minor, self.patch)
    }
}

/// The interpreter used to create the virtual environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostInterpreter {
    pub path: PathBuf,
    pub version: PythonVersion,
}

impl HostInterpreter {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Find the first usable interpreter among `candidates`.
///
/// A candidate is usable when it resolves on `PATH`, runs `--version`
/// successfully and reports a version with `venv` support.
pub fn discover<R: ProcessRunner + ?Sized>(
    runner: &R,
    candidates: &[String],
) -> Result<HostInterpreter> {
    for name in candidates {
        let Some(path) = runner.locate(name) else {
            debug!(candidate = %name, "not found on PATH");
            continue;
        };
        let check = Invocation::new(&path).arg("--version");
        let out = match runner.output(&check) {
            Ok(out) => out,
            Err(e) => {
                debug!(candidate = %name, error = %e, "version check failed to start");
                continue;
            }
        };
        if !out.status.success() {
            debug!(candidate = %name, status = %out.status, "version check failed");
            continue;
        }
        // Python 2 prints the version on stderr.
        let reported = if out.stdout.trim().is_empty() {
            &out.stderr
        } else {
            &out.stdout
        };
        match PythonVersion::parse(reported) {
            Some(version) if version.supports_venv() => {
                info!(path = %path.display(), %version, "using Python interpreter");
                return Ok(HostInterpreter { path, version });
            }
            Some(version) => {
                debug!(candidate = %name, %version, "too old for venv, skipping");
            }
            None => {
                debug!(candidate = %name, output = %reported.trim(), "unrecognised version output");
            }
        }
    }
    Err(LaunchError::InterpreterNotFound {
        tried: candidates.join(", "),
    })
}
