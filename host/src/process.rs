//! Child process plumbing.
//!
//! Every external command the launcher runs is described as an [`Invocation`]
//! and handed to a [`ProcessRunner`]. [`SystemRunner`] spawns real processes;
//! tests substitute a scripted runner.

use std::ffi::{OsStr, OsString};
use std::fmt;
use std::io;
use std::path::{Path, PathBuf};
use std::process::{Command, ExitStatus, Stdio};
use std::sync::atomic::{AtomicBool, Ordering};

use tracing::{debug, warn};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

/// Install a Ctrl-C handler that records the interrupt.
///
/// The terminal delivers the signal to the foreground child as well, so the
/// launcher keeps waiting for a running child and still reports its status.
/// The pipeline checks the flag between steps and stops at the next boundary.
pub fn install_interrupt_handler() -> Result<(), ctrlc::Error> {
    ctrlc::set_handler(|| {
        if !INTERRUPTED.swap(true, Ordering::SeqCst) {
            warn!("interrupt received, waiting for the child process to exit");
        }
    })
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// A command line plus the environment changes to apply to it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    program: PathBuf,
    args: Vec<OsString>,
    envs: Vec<(OsString, OsString)>,
    env_removals: Vec<OsString>,
    current_dir: Option<PathBuf>,
}

impl Invocation {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            args: Vec::new(),
            envs: Vec::new(),
            env_removals: Vec::new(),
            current_dir: None,
        }
    }

    pub fn arg(mut self, arg: impl AsRef<OsStr>) -> Self {
        self.args.push(arg.as_ref().to_os_string());
        self
    }

    pub fn args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<OsStr>,
    {
        self.args
            .extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
        self
    }

    pub fn env(mut self, key: impl AsRef<OsStr>, value: impl AsRef<OsStr>) -> Self {
        let key = key.as_ref().to_os_string();
        self.env_removals.retain(|k| *k != key);
        self.envs.retain(|(k, _)| *k != key);
        self.envs.push((key, value.as_ref().to_os_string()));
        self
    }

    pub fn env_remove(mut self, key: impl AsRef<OsStr>) -> Self {
        let key = key.as_ref().to_os_string();
        self.envs.retain(|(k, _)| *k != key);
        self.env_removals.push(key);
        self
    }

    pub fn current_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.current_dir = Some(dir.into());
        self
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    pub fn get_args(&self) -> &[OsString] {
        &self.args
    }

    pub fn get_env(&self, key: &str) -> Option<&OsStr> {
        self.envs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_os_str())
    }

    pub fn removes_env(&self, key: &str) -> bool {
        self.env_removals.iter().any(|k| k == key)
    }

    pub fn get_current_dir(&self) -> Option<&Path> {
        self.current_dir.as_deref()
    }

    /// Arguments as UTF-8 (lossy), mostly for logging and matching.
    pub fn args_lossy(&self) -> Vec<String> {
        self.args
            .iter()
            .map(|a| a.to_string_lossy().into_owned())
            .collect()
    }

    /// `program arg1 arg2 ...`, for log lines and error messages.
    pub fn command_line(&self) -> String {
        let mut line = self.program.display().to_string();
        for arg in &self.args {
            line.push(' ');
            line.push_str(&arg.to_string_lossy());
        }
        line
    }

    fn to_command(&self) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args);
        for key in &self.env_removals {
            cmd.env_remove(key);
        }
        for (key, value) in &self.envs {
            cmd.env(key, value);
        }
        if let Some(dir) = &self.current_dir {
            cmd.current_dir(dir);
        }
        cmd
    }
}

/// How a child process ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunStatus {
    code: Option<i32>,
}

impl RunStatus {
    pub fn from_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// A process that ended without an exit code (killed by a signal).
    pub fn signalled() -> Self {
        Self { code: None }
    }

    pub fn success(&self) -> bool {
        self.code == Some(0)
    }

    pub fn code(&self) -> Option<i32> {
        self.code
    }
}

impl From<ExitStatus> for RunStatus {
    fn from(status: ExitStatus) -> Self {
        Self {
            code: status.code(),
        }
    }
}

impl fmt::Display for RunStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.code {
            Some(code) => write!(f, "exit code {code}"),
            None => f.write_str("terminated by signal"),
        }
    }
}

/// Captured result of a process run with piped output.
#[derive(Debug, Clone)]
pub struct Captured {
    pub status: RunStatus,
    pub stdout: String,
    pub stderr: String,
}

/// Seam between the launcher pipeline and the operating system.
pub trait ProcessRunner {
    /// Resolve a program name against `PATH`. Paths containing a separator are
    /// checked directly.
    fn locate(&self, program: &str) -> Option<PathBuf> {
        which::which(program).ok()
    }

    /// Run with inherited stdio and wait for completion.
    fn status(&self, invocation: &Invocation) -> io::Result<RunStatus>;

    /// Run with piped stdout/stderr and wait for completion.
    fn output(&self, invocation: &Invocation) -> io::Result<Captured>;

    /// Whether the user asked to abort since the launcher started.
    fn interrupted(&self) -> bool {
        interrupted()
    }
}

/// Spawns real child processes through `std::process`.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemRunner;

impl ProcessRunner for SystemRunner {
    fn status(&self, invocation: &Invocation) -> io::Result<RunStatus> {
        debug!(command = %invocation.command_line(), "spawning");
        let status = invocation
            .to_command()
            .stdin(Stdio::inherit())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()?;
        if interrupted() {
            debug!(%status, "child exited after interrupt");
        }
        Ok(status.into())
    }

    fn output(&self, invocation: &Invocation) -> io::Result<Captured> {
        debug!(command = %invocation.command_line(), "spawning (captured)");
        let out = invocation.to_command().stdin(Stdio::null()).output()?;
        Ok(Captured {
            status: out.status.into(),
            stdout: String::from_utf8_lossy(&out.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&out.stderr).into_owned(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn env_and_removal_override_each_other() {
        let inv = Invocation::new("python")
            .env("PYTHONHOME", "/opt")
            .env_remove("PYTHONHOME")
            .env("VIRTUAL_ENV", "/a")
            .env("VIRTUAL_ENV", "/b");
        assert!(inv.removes_env("PYTHONHOME"));
        assert_eq!(inv.get_env("PYTHONHOME"), None);
        assert_eq!(inv.get_env("VIRTUAL_ENV"), Some(OsStr::new("/b")));
    }

    #[test]
    fn command_line_joins_program_and_args() {
        let inv = Invocation::new("python3").args(["-m", "venv", "venv"]);
        assert_eq!(inv.command_line(), "python3 -m venv venv");
        assert_eq!(inv.args_lossy(), vec!["-m", "venv", "venv"]);
    }

    #[test]
    fn run_status_display() {
        assert_eq!(RunStatus::from_code(0).to_string(), "exit code 0");
        assert!(RunStatus::from_code(0).success());
        assert!(!RunStatus::from_code(2).success());
        assert!(!RunStatus::signalled().success());
        assert_eq!(RunStatus::signalled().to_string(), "terminated by signal");
    }

    #[test]
    fn spawning_a_missing_program_is_an_io_error() {
        let inv = Invocation::new("microfeed-host-test-no-such-program");
        assert!(SystemRunner.output(&inv).is_err());
    }
}
