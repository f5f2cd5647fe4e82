//! Launcher errors.
//!
//! Every step either succeeds or aborts the whole run; there is no retry and
//! no rollback. The binary maps any of these to exit status 1.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

use crate::process::RunStatus;

pub type Result<T> = std::result::Result<T, LaunchError>;

#[derive(Debug, Error)]
pub enum LaunchError {
    #[error("no usable Python interpreter found (tried: {tried})")]
    InterpreterNotFound { tried: String },

    #[error("failed to run `{program}`: {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("{} exists but is not a directory", path.display())]
    VenvNotADirectory { path: PathBuf },

    #[error("failed to remove existing environment {}: {source}", path.display())]
    VenvRemove {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to create virtual environment at {} ({status}): {stderr}", path.display())]
    VenvCreate {
        path: PathBuf,
        status: RunStatus,
        stderr: String,
    },

    #[error("failed to activate virtual environment at {}: {reason}", path.display())]
    Activation { path: PathBuf, reason: String },

    #[error("failed to upgrade pip ({status})")]
    InstallerUpgrade { status: RunStatus },

    #[error("dependency manifest {} could not be read: {source}", path.display())]
    ManifestMissing {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("failed to install dependencies from {} ({status})", path.display())]
    DependencyInstall { path: PathBuf, status: RunStatus },

    #[error("application entry point {} not found", path.display())]
    EntryMissing { path: PathBuf },

    #[error("application {} failed ({status})", entry.display())]
    AppFailed { entry: PathBuf, status: RunStatus },

    #[error("interrupted")]
    Interrupted,

    #[error("invalid configuration in {}: {message}", path.display())]
    Config { path: PathBuf, message: String },
}

impl LaunchError {
    /// Process exit status for this error. The model is flat: every failure is fatal.
    pub fn exit_code(&self) -> u8 {
        1
    }

    /// Short follow-up advice printed under the error message, if any.
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InterpreterNotFound { .. } => {
                Some("Install Python 3 and make sure it is on your PATH, or pass --python.")
            }
            Self::Activation { .. } | Self::VenvCreate { .. } => {
                Some("Delete the environment directory or rerun with --recreate.")
            }
            Self::ManifestMissing { .. } => {
                Some("Run from the directory containing requirements.txt, or pass --requirements.")
            }
            Self::EntryMissing { .. } => Some("Pass --entry to point at the application script."),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_failure_maps_to_one() {
        let errors = [
            LaunchError::InterpreterNotFound {
                tried: "python3, python".into(),
            },
            LaunchError::InstallerUpgrade {
                status: RunStatus::from_code(2),
            },
            LaunchError::AppFailed {
                entry: PathBuf::from("microfeed.py"),
                status: RunStatus::signalled(),
            },
            LaunchError::Interrupted,
        ];
        for err in &errors {
            assert_eq!(err.exit_code(), 1, "{err}");
        }
    }

    #[test]
    fn messages_name_the_failing_path() {
        let err = LaunchError::DependencyInstall {
            path: PathBuf::from("requirements.txt"),
            status: RunStatus::from_code(1),
        };
        let msg = err.to_string();
        assert!(msg.contains("requirements.txt"));
        assert!(msg.contains("exit code 1"));
    }

    #[test]
    fn missing_interpreter_has_hint() {
        let err = LaunchError::InterpreterNotFound {
            tried: "python3".into(),
        };
        assert!(err.hint().unwrap().contains("PATH"));
        let err = LaunchError::AppFailed {
            entry: PathBuf::from("app.py"),
            status: RunStatus::from_code(3),
        };
        assert!(err.hint().is_none());
    }
}
