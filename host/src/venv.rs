//! Virtual environment: create-or-reuse, activation and deactivation.
//!
//! Activation never touches the launcher's own process environment. It yields
//! an [`Activation`] guard whose overlay is applied to each child command;
//! dropping the guard is deactivation.

use std::cell::Cell;
use std::env;
use std::ffi::OsString;
use std::fmt;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};

use crate::error::{LaunchError, Result};
use crate::interpreter::HostInterpreter;
use crate::process::{Invocation, ProcessRunner};

/// Directory structure of a venv, which differs between Windows and POSIX.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VenvLayout {
    /// `bin/python`
    Posix,
    /// `Scripts\python.exe`
    Windows,
}

impl VenvLayout {
    pub fn native() -> Self {
        if cfg!(windows) {
            Self::Windows
        } else {
            Self::Posix
        }
    }

    pub fn scripts_dir(self) -> &'static str {
        match self {
            Self::Posix => "bin",
            Self::Windows => "Scripts",
        }
    }

    pub fn python_file(self) -> &'static str {
        match self {
            Self::Posix => "python",
            Self::Windows => "python.exe",
        }
    }
}

/// What [`VirtualEnv::ensure`] had to do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provisioned {
    Created,
    Reused,
    Recreated,
}

impl fmt::Display for Provisioned {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Created => "created",
            Self::Reused => "reused",
            Self::Recreated => "recreated",
        })
    }
}

#[derive(Debug)]
pub struct VirtualEnv {
    root: PathBuf,
    layout: VenvLayout,
    active: Cell<bool>,
}

impl VirtualEnv {
    pub fn at(root: impl Into<PathBuf>, layout: VenvLayout) -> Self {
        Self {
            root: root.into(),
            layout,
            active: Cell::new(false),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn layout(&self) -> VenvLayout {
        self.layout
    }

    pub fn scripts_dir(&self) -> PathBuf {
        self.root.join(self.layout.scripts_dir())
    }

    pub fn python(&self) -> PathBuf {
        self.scripts_dir().join(self.layout.python_file())
    }

    pub fn is_active(&self) -> bool {
        self.active.get()
    }

    /// Make sure the environment directory exists, creating it with the host
    /// interpreter only when absent. An existing directory is reused as is
    /// unless `recreate` is set.
    pub fn ensure<R: ProcessRunner + ?Sized>(
        &self,
        runner: &R,
        host: &HostInterpreter,
        recreate: bool,
    ) -> Result<Provisioned> {
        let existed = match self.root.symlink_metadata() {
            Ok(meta) if meta.is_dir() || self.root.is_dir() => true,
            Ok(_) => {
                return Err(LaunchError::VenvNotADirectory {
                    path: self.root.clone(),
                })
            }
            Err(_) => false,
        };

        if existed && !recreate {
            info!(path = %self.root.display(), "reusing existing virtual environment");
            return Ok(Provisioned::Reused);
        }

        if existed {
            warn!(path = %self.root.display(), "removing virtual environment for recreation");
            std::fs::remove_dir_all(&self.root).map_err(|source| LaunchError::VenvRemove {
                path: self.root.clone(),
                source,
            })?;
        }

        info!(path = %self.root.display(), "creating virtual environment");
        let create = Invocation::new(host.path())
            .arg("-m")
            .arg("venv")
            .arg(&self.root);
        let out = runner.output(&create).map_err(|source| LaunchError::Spawn {
            program: create.command_line(),
            source,
        })?;
        if !out.status.success() {
            return Err(LaunchError::VenvCreate {
                path: self.root.clone(),
                status: out.status,
                stderr: out.stderr.trim().to_string(),
            });
        }

        Ok(if existed {
            Provisioned::Recreated
        } else {
            Provisioned::Created
        })
    }

    /// Activate the environment for child processes.
    ///
    /// Fails when the environment has no interpreter (a half-created or foreign
    /// directory) or is already active.
    pub fn activate(&self) -> Result<Activation<'_>> {
        if self.active.get() {
            return Err(self.activation_error("environment is already active"));
        }
        let python = self.python();
        if !python.is_file() {
            return Err(self.activation_error(format!("{} is missing", python.display())));
        }

        let inherited = env::var_os("PATH").unwrap_or_default();
        let mut entries = vec![self.scripts_dir()];
        entries.extend(env::split_paths(&inherited));
        let path_var = env::join_paths(entries)
            .map_err(|e| self.activation_error(format!("cannot build PATH: {e}")))?;

        self.active.set(true);
        debug!(path = %self.root.display(), "activated");
        Ok(Activation {
            venv: self,
            python,
            path_var,
        })
    }

    fn activation_error(&self, reason: impl Into<String>) -> LaunchError {
        LaunchError::Activation {
            path: self.root.clone(),
            reason: reason.into(),
        }
    }
}

/// An active environment. Dropping it deactivates the environment.
#[derive(Debug)]
pub struct Activation<'a> {
    venv: &'a VirtualEnv,
    python: PathBuf,
    path_var: OsString,
}

impl<'a> Activation<'a> {
    pub fn venv(&self) -> &'a VirtualEnv {
        self.venv
    }

    /// The environment's own interpreter.
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// `python <args...>` running inside the environment.
    pub fn python_command(&self) -> Invocation {
        self.apply(Invocation::new(&self.python))
    }

    /// Apply the activation overlay to an arbitrary command.
    pub fn apply(&self, invocation: Invocation) -> Invocation {
        invocation
            .env("VIRTUAL_ENV", self.venv.root())
            .env("PATH", &self.path_var)
            .env_remove("PYTHONHOME")
    }

    /// Explicit form of dropping the guard.
    pub fn deactivate(self) {}
}

impl Drop for Activation<'_> {
    fn drop(&mut self) {
        self.venv.active.set(false);
        debug!(path = %self.venv.root().display(), "deactivated");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    fn fake_env(dir: &Path) -> VirtualEnv {
        let venv = VirtualEnv::at(dir.join("venv"), VenvLayout::Posix);
        fs::create_dir_all(venv.scripts_dir()).unwrap();
        fs::write(venv.python(), "").unwrap();
        venv
    }

    #[test]
    fn layouts_place_the_interpreter() {
        let posix = VirtualEnv::at("/w/venv", VenvLayout::Posix);
        assert_eq!(posix.python(), Path::new("/w/venv/bin/python"));
        let win = VirtualEnv::at("venv", VenvLayout::Windows);
        assert_eq!(
            win.python(),
            Path::new("venv").join("Scripts").join("python.exe")
        );
    }

    #[test]
    fn activation_requires_an_interpreter() {
        let tmp = tempfile::tempdir().unwrap();
        let venv = VirtualEnv::at(tmp.path().join("venv"), VenvLayout::Posix);
        fs::create_dir_all(venv.root()).unwrap();
        let err = venv.activate().unwrap_err();
        assert!(matches!(err, LaunchError::Activation { .. }));
        assert!(!venv.is_active());
    }

    #[test]
    fn overlay_prepends_scripts_dir_and_drops_pythonhome() {
        let tmp = tempfile::tempdir().unwrap();
        let venv = fake_env(tmp.path());
        let active = venv.activate().unwrap();
        let cmd = active.python_command().arg("-V");

        assert_eq!(cmd.program(), venv.python());
        assert_eq!(cmd.get_env("VIRTUAL_ENV"), Some(venv.root().as_os_str()));
        let path = cmd.get_env("PATH").unwrap();
        let first = env::split_paths(path).next().unwrap();
        assert_eq!(first, venv.scripts_dir());
        assert!(cmd.removes_env("PYTHONHOME"));
    }

    #[test]
    fn dropping_the_guard_deactivates() {
        let tmp = tempfile::tempdir().unwrap();
        let venv = fake_env(tmp.path());
        {
            let _active = venv.activate().unwrap();
            assert!(venv.is_active());
            assert!(venv.activate().is_err());
        }
        assert!(!venv.is_active());
        venv.activate().unwrap().deactivate();
        assert!(!venv.is_active());
    }

    #[test]
    fn activation_leaves_launcher_environment_alone() {
        let tmp = tempfile::tempdir().unwrap();
        let venv = fake_env(tmp.path());
        let before = env::var_os("VIRTUAL_ENV");
        let _active = venv.activate().unwrap();
        assert_eq!(env::var_os("VIRTUAL_ENV"), before);
    }
}
