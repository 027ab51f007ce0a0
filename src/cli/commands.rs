// file: src/cli/commands.rs
// version: 1.0.0
// guid: b07a6dc5-ea69-4e62-970f-82a93ee01cf3

//! Command implementations for the CLI

use super::args::InstallArgs;
use crate::{
    config::RunFlags,
    error::InstallError,
    installer::{InstallOutcome, InstallState, Installer, InstallerOptions},
    utils::system::SystemUtils,
    Result,
};
use std::future::Future;
use tokio::sync::watch;
use tracing::{info, warn};

/// Install LLMOS with the settings from the command line, publishing the
/// installer state on `progress`
pub async fn install_command(
    flags: RunFlags,
    args: InstallArgs,
    progress: watch::Sender<InstallState>,
) -> Result<InstallOutcome> {
    let config = args.to_config(&flags);

    if config.install.silent && config.install.config_url.is_empty() {
        return Err(InstallError::sanitize(
            "--config-url is required in silent mode",
        ));
    }

    if !flags.dev_mode && !SystemUtils::is_root() {
        return Err(InstallError::config(
            "llmos install must be run as root (use --dev to skip this check)",
        ));
    }

    let missing = SystemUtils::missing_tools();
    if !missing.is_empty() {
        warn!("Missing tools may break the installation: {}", missing.join(", "));
    }

    let options = InstallerOptions {
        force: args.force,
        ..InstallerOptions::default()
    };
    let mut installer = Installer::new(config, flags)
        .with_options(options)
        .with_progress(progress);
    let outcome = installer.run().await?;

    info!("LLMOS installation finished");
    Ok(outcome)
}

/// Drive `command` to completion, giving up on `interrupt` only while
/// `progress` reports an interruptible state. `None` when abandoned.
pub async fn run_interruptible<F, I, S>(
    command: F,
    progress: &watch::Receiver<InstallState>,
    mut interrupt: I,
) -> Option<F::Output>
where
    F: Future,
    I: FnMut() -> S,
    S: Future<Output = ()>,
{
    tokio::pin!(command);
    loop {
        tokio::select! {
            output = &mut command => return Some(output),
            _ = interrupt() => {
                if progress.borrow().is_interruptible() {
                    return None;
                }
                warn!("Installation in progress, waiting for it to finish");
            }
        }
    }
}

/// Print version information
pub fn version_command() -> String {
    format!("{} {}", env!("CARGO_PKG_NAME"), crate::VERSION)
}
