// file: src/cli/args.rs
// version: 1.0.0
// guid: de914958-8849-448b-830c-24e7d8b0a76d

//! Command line argument definitions

use crate::config::{config_path, LlmosConfig, RunFlags};
use clap::{ArgAction, Args, Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "llmos")]
#[command(about = "Install LLMOS onto a local disk")]
#[command(version = env!("CARGO_PKG_VERSION"))]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Enable debug logging and pass --debug to the installer
    #[arg(long, global = true, env = "LLMOS_DEBUG")]
    pub debug: bool,

    /// Development mode: skips the root check
    #[arg(long = "dev", global = true, env = "LLMOS_DEV_MODE")]
    pub dev_mode: bool,

    /// Directory holding LLMOS configuration drop-ins
    #[arg(long, global = true, default_value_t = default_config_dir())]
    pub config_dir: String,

    #[arg(short, long, global = true)]
    pub quiet: bool,
}

fn default_config_dir() -> String {
    config_path(&["config.d"]).display().to_string()
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Install LLMOS to the target disk
    Install(InstallArgs),

    /// Print version information
    Version,
}

#[derive(Args, Debug, Clone, Default, PartialEq, Eq)]
pub struct InstallArgs {
    /// System source image, e.g. oci:ghcr.io/llmos-ai/llmos:latest
    #[arg(short = 's', long = "source")]
    pub system_uri: Option<String>,

    /// Run without prompts; requires --config-url
    #[arg(short = 'S', long)]
    pub silent: bool,

    /// Reboot once the installation completes
    #[arg(short = 'r', long, action = ArgAction::Set, default_value_t = false)]
    pub reboot: bool,

    /// Accept the collected settings without confirmation
    #[arg(short = 'f', long)]
    pub force: bool,

    /// LLMOS config file location (file path or http URL)
    #[arg(short = 'c', long)]
    pub config_url: Option<String>,

    /// Installation disk, or `auto` for the largest one
    #[arg(short = 'd', long)]
    pub device: Option<String>,

    /// Dedicated data disk
    #[arg(long)]
    pub data_device: Option<String>,
}

impl Cli {
    pub fn run_flags(&self) -> RunFlags {
        RunFlags {
            debug: self.debug,
            dev_mode: self.dev_mode,
            config_dir: self.config_dir.clone(),
        }
    }
}

impl InstallArgs {
    /// Intent seeded from the command line
    pub fn to_config(&self, flags: &RunFlags) -> LlmosConfig {
        let mut config = LlmosConfig::new_default(flags);
        let install = &mut config.install;
        install.silent = self.silent;
        install.reboot = self.reboot;
        install.system_uri = self.system_uri.clone().unwrap_or_default();
        install.config_url = self.config_url.clone().unwrap_or_default();
        install.device = self.device.clone().unwrap_or_default();
        install.data_device = self.data_device.clone().unwrap_or_default();
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_install_flags() {
        let cli = Cli::try_parse_from([
            "llmos",
            "--debug",
            "install",
            "-S",
            "-r",
            "true",
            "-c",
            "https://example.com/llmos.yaml",
            "-d",
            "/dev/sda",
            "--data-device",
            "/dev/sdb",
            "-s",
            "oci:llmos:v1",
        ])
        .unwrap();
        assert!(cli.debug);
        assert!(!cli.dev_mode);
        assert_eq!(cli.config_dir, "/etc/llmos/config.d");

        let Commands::Install(ref args) = cli.command else {
            panic!("expected install command");
        };
        let config = args.to_config(&cli.run_flags());
        assert!(config.install.silent);
        assert!(config.install.reboot);
        assert!(config.install.debug);
        assert_eq!(config.install.config_url, "https://example.com/llmos.yaml");
        assert_eq!(config.install.device, "/dev/sda");
        assert_eq!(config.install.data_device, "/dev/sdb");
        assert_eq!(config.install.system_uri, "oci:llmos:v1");
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["llmos", "install", "--dev", "--config-dir", "/tmp/llmos"])
            .unwrap();
        assert!(cli.dev_mode);
        assert_eq!(cli.run_flags().config_dir, "/tmp/llmos");
    }

    #[test]
    fn test_reboot_requires_value() {
        assert!(Cli::try_parse_from(["llmos", "install", "-r", "maybe"]).is_err());
    }
}
