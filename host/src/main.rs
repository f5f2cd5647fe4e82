use std::error::Error as _;
use std::process::ExitCode;

use anyhow::Context;
use tracing::{debug, info, warn};

use microfeed_host::cli::Cli;
use microfeed_host::{observability, process};
use microfeed_host::{Launcher, LauncherConfig, Report, SystemRunner};

fn main() -> ExitCode {
    let cli = Cli::parse_with_env_files(std::env::args_os()).unwrap_or_else(|e| e.exit());
    observability::init_tracing(cli.verbosity());

    if let Err(e) = install_signal_handling() {
        warn!("{e:#}");
    }

    match run(cli) {
        Ok(report) => {
            info!(
                python = %report.interpreter.version,
                venv = %report.provisioned,
                requirements = report.requirements,
                status = %report.app_status,
                "done"
            );
            ExitCode::SUCCESS
        }
        Err(err) => {
            let mut source = err.source();
            while let Some(cause) = source {
                debug!(%cause, "caused by");
                source = cause.source();
            }
            eprintln!("error: {err}");
            if let Some(hint) = err.hint() {
                eprintln!("hint: {hint}");
            }
            ExitCode::from(err.exit_code())
        }
    }
}

fn install_signal_handling() -> anyhow::Result<()> {
    process::install_interrupt_handler().context("failed to install Ctrl-C handler")
}

fn run(cli: Cli) -> microfeed_host::Result<Report> {
    let config = LauncherConfig::resolve(cli.into_overrides())?;
    Launcher::new(config, &SystemRunner).run()
}
