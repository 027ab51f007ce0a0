// file: src/main.rs
// version: 1.0.0
// guid: 5e2f9b8c-3d41-4a6e-b7c2-91d0e4f6a813

//! LLMOS installer - Main entry point

use clap::Parser;
use colored::Colorize;
use llmos_installer::{
    cli::{install_command, run_interruptible, version_command, Cli, Commands},
    installer::{InstallOutcome, InstallState},
    logging::logger,
};
use std::process::ExitCode;
use tokio::signal;
use tokio::sync::watch;
use tracing::warn;

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = logger::init_logger(cli.debug, cli.quiet) {
        eprintln!("{} {}", "warning:".yellow().bold(), e);
    }

    let flags = cli.run_flags();
    let (progress_tx, progress) = watch::channel(InstallState::CollectingInput);
    let command_future = async {
        match cli.command {
            Commands::Install(args) => install_command(flags, args, progress_tx).await.map(Some),
            Commands::Version => {
                println!("{}", version_command());
                Ok(None)
            }
        }
    };

    let interrupt = || async {
        if signal::ctrl_c().await.is_err() {
            std::future::pending::<()>().await;
        }
    };

    match run_interruptible(command_future, &progress, interrupt).await {
        Some(Ok(Some(InstallOutcome::CompletedWithWarning(e)))) => {
            eprintln!("{} {}", "warning:".yellow().bold(), e);
            ExitCode::SUCCESS
        }
        Some(Ok(_)) => ExitCode::SUCCESS,
        Some(Err(e)) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
        None => {
            warn!("Installation interrupted by user");
            ExitCode::from(130)
        }
    }
}
