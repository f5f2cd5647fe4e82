use std::ffi::OsString;
use std::path::PathBuf;

use clap::{ArgAction, Parser};

use crate::config::{env_keys, load_dotenv, Overrides};
use crate::observability::Verbosity;

/// Set up the Video Uploader's Python environment and run it.
///
/// With no arguments: checks for Python, creates `venv/` if absent, upgrades
/// pip, installs `requirements.txt` and runs `microfeed.py`.
#[derive(Parser, Debug)]
#[command(name = "microfeed-host")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Python interpreter used to create the environment
    #[arg(long, value_name = "PATH", env = env_keys::PYTHON)]
    pub python: Option<String>,

    /// Virtual environment directory
    #[arg(long, value_name = "DIR", env = env_keys::VENV_DIR)]
    pub venv_dir: Option<PathBuf>,

    /// Dependency manifest passed to `pip install -r`
    #[arg(long, value_name = "FILE", env = env_keys::REQUIREMENTS)]
    pub requirements: Option<PathBuf>,

    /// Application entry point
    #[arg(long, value_name = "FILE", env = env_keys::ENTRY)]
    pub entry: Option<PathBuf>,

    /// Directory relative paths are resolved against (default: current dir)
    #[arg(long, value_name = "DIR", env = env_keys::WORKDIR)]
    pub workdir: Option<PathBuf>,

    /// Launcher config file (default: launcher.toml if present)
    #[arg(long, value_name = "FILE", env = env_keys::CONFIG)]
    pub config: Option<PathBuf>,

    /// Delete and rebuild an existing environment
    #[arg(long)]
    pub recreate: bool,

    /// Skip `pip install --upgrade pip`
    #[arg(long)]
    pub no_upgrade_pip: bool,

    /// Only log warnings and errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,

    /// More logging (-v debug, -vv trace)
    #[arg(short, long, action = ArgAction::Count)]
    pub verbose: u8,

    /// Arguments forwarded to the application
    #[arg(last = true, value_name = "APP_ARGS")]
    pub app_args: Vec<OsString>,
}

impl Cli {
    /// Parse `args`, feeding `.env` files into the flag env fallbacks.
    ///
    /// `.env` in the current directory is loaded first. When `--workdir` (or
    /// its env var) points elsewhere, that directory's `.env` fills in what is
    /// still unset and the arguments are parsed again. Already-set variables
    /// always win.
    pub fn parse_with_env_files<I, T>(args: I) -> Result<Self, clap::Error>
    where
        I: IntoIterator<Item = T>,
        T: Into<OsString> + Clone,
    {
        let args: Vec<OsString> = args.into_iter().map(Into::into).collect();
        let cwd = std::env::current_dir().ok();
        if let Some(cwd) = &cwd {
            load_dotenv(cwd);
        }
        let cli = Self::try_parse_from(&args)?;
        let Some(workdir) = &cli.workdir else {
            return Ok(cli);
        };
        let workdir = match &cwd {
            Some(cwd) => cwd.join(workdir),
            None => workdir.clone(),
        };
        if cwd.as_deref() == Some(workdir.as_path()) || load_dotenv(&workdir) == 0 {
            return Ok(cli);
        }
        Self::try_parse_from(&args)
    }

    pub fn verbosity(&self) -> Verbosity {
        Verbosity::from_flags(self.quiet, self.verbose)
    }

    pub fn into_overrides(self) -> Overrides {
        Overrides {
            python: self.python,
            venv_dir: self.venv_dir,
            requirements: self.requirements,
            entry: self.entry,
            workdir: self.workdir,
            config: self.config,
            recreate: self.recreate,
            no_upgrade_pip: self.no_upgrade_pip,
            app_args: self.app_args,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn trailing_args_are_forwarded() {
        let cli = Cli::try_parse_from([
            "microfeed-host",
            "--entry",
            "app.py",
            "--recreate",
            "--",
            "--folder",
            "videos",
        ])
        .unwrap();
        assert_eq!(cli.entry, Some(PathBuf::from("app.py")));
        assert!(cli.recreate);
        let overrides = cli.into_overrides();
        assert_eq!(
            overrides.app_args,
            vec![OsString::from("--folder"), OsString::from("videos")]
        );
    }

    #[test]
    fn quiet_and_verbose_conflict() {
        assert!(Cli::try_parse_from(["microfeed-host", "-q", "-v"]).is_err());
        let cli = Cli::try_parse_from(["microfeed-host", "-vv"]).unwrap();
        assert_eq!(cli.verbosity(), Verbosity::Trace);
    }
}
