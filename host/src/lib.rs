//! Provision an isolated Python environment for the Video Uploader and run it.
//!
//! The pipeline is strictly sequential: interpreter check, venv create-or-reuse,
//! activation, pip upgrade, dependency install, application launch,
//! deactivation. The first failure aborts the run.

pub mod cli;
pub mod config;
pub mod error;
pub mod interpreter;
pub mod launch;
pub mod observability;
pub mod process;
pub mod provision;
pub mod venv;

use tracing::{info, info_span, warn};

pub use config::LauncherConfig;
pub use error::{LaunchError, Result};
pub use process::{ProcessRunner, RunStatus, SystemRunner};

use interpreter::HostInterpreter;
use provision::Manifest;
use venv::{Provisioned, VirtualEnv};

/// Outcome of a successful run.
#[derive(Debug, Clone)]
pub struct Report {
    pub interpreter: HostInterpreter,
    pub provisioned: Provisioned,
    pub requirements: usize,
    pub app_status: RunStatus,
}

pub struct Launcher<'r, R: ProcessRunner + ?Sized> {
    config: LauncherConfig,
    runner: &'r R,
}

impl<'r, R: ProcessRunner + ?Sized> Launcher<'r, R> {
    pub fn new(config: LauncherConfig, runner: &'r R) -> Self {
        Self { config, runner }
    }

    pub fn config(&self) -> &LauncherConfig {
        &self.config
    }

    /// Abort between steps once Ctrl-C has been pressed. A pending
    /// `Activation` is still dropped on the way out.
    fn checkpoint(&self) -> Result<()> {
        if self.runner.interrupted() {
            warn!("interrupted, stopping before the next step");
            return Err(LaunchError::Interrupted);
        }
        Ok(())
    }

    /// Provision the environment and run the application once.
    pub fn run(&self) -> Result<Report> {
        let cfg = &self.config;

        let interpreter = info_span!("check_interpreter")
            .in_scope(|| interpreter::discover(self.runner, &cfg.python_candidates))?;
        self.checkpoint()?;

        let venv = VirtualEnv::at(&cfg.venv_dir, cfg.layout);
        let provisioned = info_span!("ensure_venv")
            .in_scope(|| venv.ensure(self.runner, &interpreter, cfg.recreate))?;
        info!(path = %venv.root().display(), %provisioned, "virtual environment ready");
        self.checkpoint()?;

        // Deactivated when `active` drops, on every path out of this function.
        let active = info_span!("activate").in_scope(|| venv.activate())?;
        self.checkpoint()?;

        if cfg.upgrade_pip {
            info_span!("upgrade_pip")
                .in_scope(|| provision::upgrade_installer(&active, self.runner))?;
            self.checkpoint()?;
        }

        let manifest = info_span!("install_dependencies").in_scope(|| {
            let manifest = Manifest::load(&cfg.requirements)?;
            provision::install_dependencies(&active, self.runner, &manifest)?;
            Ok::<_, LaunchError>(manifest)
        })?;
        self.checkpoint()?;

        let app_status = info_span!("launch").in_scope(|| {
            launch::launch_app(
                &active,
                self.runner,
                &cfg.entry,
                &cfg.app_args,
                &cfg.workdir,
            )
        });
        active.deactivate();
        let app_status = app_status?;

        Ok(Report {
            interpreter,
            provisioned,
            requirements: manifest.requirements().len(),
            app_status,
        })
    }
}
