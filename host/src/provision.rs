//! Installer upgrade and dependency installation inside the active environment.

use std::path::{Path, PathBuf};

use tracing::{info, warn};

use crate::error::{LaunchError, Result};
use crate::process::{Invocation, ProcessRunner, RunStatus};
use crate::venv::Activation;

/// A requirements manifest (`requirements.txt`).
#[derive(Debug, Clone)]
pub struct Manifest {
    path: PathBuf,
    requirements: Vec<String>,
}

impl Manifest {
    /// Read the manifest. Validation of its contents is left to pip.
    pub fn load(path: &Path) -> Result<Self> {
        let content =
            std::fs::read_to_string(path).map_err(|source| LaunchError::ManifestMissing {
                path: path.to_path_buf(),
                source,
            })?;
        Ok(Self::parse(path, &content))
    }

    fn parse(path: &Path, content: &str) -> Self {
        let requirements = content
            .lines()
            .map(|l| match l.find(" #") {
                Some(idx) => &l[..idx],
                None => l,
            })
            .map(str::trim)
            .filter(|l| !l.is_empty() && !l.starts_with('#'))
            .map(String::from)
            .collect();
        Self {
            path: path.to_path_buf(),
            requirements,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Requirement lines (options like `-r other.txt` included), without comments.
    pub fn requirements(&self) -> &[String] {
        &self.requirements
    }
}

fn run_in_env<R: ProcessRunner + ?Sized>(
    runner: &R,
    invocation: &Invocation,
) -> Result<RunStatus> {
    runner
        .status(invocation)
        .map_err(|source| LaunchError::Spawn {
            program: invocation.command_line(),
            source,
        })
}

/// `python -m pip install --upgrade pip` inside the environment.
pub fn upgrade_installer<R: ProcessRunner + ?Sized>(
    active: &Activation<'_>,
    runner: &R,
) -> Result<()> {
    info!("upgrading pip");
    let cmd = active
        .python_command()
        .args(["-m", "pip", "install", "--upgrade", "pip"]);
    let status = run_in_env(runner, &cmd)?;
    if !status.success() {
        return Err(LaunchError::InstallerUpgrade { status });
    }
    Ok(())
}

/// `python -m pip install -r <manifest>` inside the environment.
pub fn install_dependencies<R: ProcessRunner + ?Sized>(
    active: &Activation<'_>,
    runner: &R,
    manifest: &Manifest,
) -> Result<()> {
    if manifest.requirements().is_empty() {
        warn!(path = %manifest.path().display(), "dependency manifest lists no requirements");
    }
    info!(
        path = %manifest.path().display(),
        count = manifest.requirements().len(),
        "installing dependencies"
    );
    let cmd = active
        .python_command()
        .args(["-m", "pip", "install", "-r"])
        .arg(manifest.path());
    let status = run_in_env(runner, &cmd)?;
    if !status.success() {
        return Err(LaunchError::DependencyInstall {
            path: manifest.path().to_path_buf(),
            status,
        });
    }
    Ok(())
}
