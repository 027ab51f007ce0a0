// file: src/installer/backend.rs
// version: 1.0.0
// guid: fb2d23b4-9172-4fd2-8298-a645fb190ef9

//! External installer collaborator and its `elemental` adapter

use crate::config::InstallSettings;
use crate::error::InstallError;
use crate::Result;
use async_trait::async_trait;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

pub const ELEMENTAL_BIN: &str = "elemental";
pub const BLKDEACTIVATE_BIN: &str = "blkdeactivate";

const BLKDEACTIVATE_ARGS: [&str; 5] = [
    "--lvmoptions",
    "wholevg,retry",
    "--dmoptions",
    "force,retry",
    "--errors",
];

/// Everything the installer backend needs for one run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallRequest {
    /// Directory holding the installer `config.yaml`
    pub config_dir: PathBuf,
    pub system_uri: String,
    pub debug: bool,
    /// Environment overrides for the installer process only
    pub env: Vec<(String, String)>,
}

impl InstallRequest {
    pub fn new(config_dir: impl Into<PathBuf>, install: &InstallSettings) -> Self {
        Self {
            config_dir: config_dir.into(),
            system_uri: install.system_uri.clone(),
            debug: install.debug,
            env: install.env_pairs(),
        }
    }

    /// Arguments passed to `elemental`
    pub fn elemental_args(&self) -> Vec<String> {
        let mut args = Vec::new();
        if self.debug {
            args.push("--debug".to_string());
        }
        args.push("--config-dir".to_string());
        args.push(self.config_dir.display().to_string());
        args.push("install".to_string());
        if !self.system_uri.is_empty() {
            args.push("--system".to_string());
            args.push(self.system_uri.clone());
        }
        args.push("--squash-no-compression".to_string());
        args
    }
}

/// External partitioning and imaging tool
#[async_trait]
pub trait InstallerBackend: Send + Sync {
    /// Tear down LVM and MD devices that may hold the target disk
    async fn deactivate_devices(&self) -> Result<()>;

    /// Run the installer; irreversible once started
    async fn install(&self, request: &InstallRequest) -> Result<()>;
}

/// Backend driving the `elemental` CLI
#[derive(Debug, Clone)]
pub struct ElementalBackend {
    elemental: String,
    blkdeactivate: String,
}

impl Default for ElementalBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl ElementalBackend {
    pub fn new() -> Self {
        Self {
            elemental: ELEMENTAL_BIN.to_string(),
            blkdeactivate: BLKDEACTIVATE_BIN.to_string(),
        }
    }

    /// Use explicit binaries instead of the PATH defaults
    pub fn with_binaries(elemental: impl Into<String>, blkdeactivate: impl Into<String>) -> Self {
        Self {
            elemental: elemental.into(),
            blkdeactivate: blkdeactivate.into(),
        }
    }
}

#[async_trait]
impl InstallerBackend for ElementalBackend {
    async fn deactivate_devices(&self) -> Result<()> {
        info!("Deactivating LVM and MD devices");
        let output = Command::new(&self.blkdeactivate)
            .args(BLKDEACTIVATE_ARGS)
            .output()
            .await
            .map_err(|e| InstallError::DeactivationError {
                output: format!("failed to run {}: {}", self.blkdeactivate, e),
            })?;

        if !output.status.success() {
            let mut combined = String::from_utf8_lossy(&output.stdout).to_string();
            combined.push_str(&String::from_utf8_lossy(&output.stderr));
            return Err(InstallError::DeactivationError {
                output: combined.trim().to_string(),
            });
        }
        Ok(())
    }

    async fn install(&self, request: &InstallRequest) -> Result<()> {
        let args = request.elemental_args();
        debug!("Running {} {}", self.elemental, args.join(" "));

        // own process group: a terminal interrupt must not reach elemental
        let status = Command::new(&self.elemental)
            .args(&args)
            .envs(request.env.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .process_group(0)
            .stdin(Stdio::null())
            .stdout(Stdio::inherit())
            .stderr(Stdio::inherit())
            .status()
            .await
            .map_err(|e| InstallError::InstallationError {
                exit_code: None,
                output: format!("failed to run {}: {}", self.elemental, e),
            })?;

        if !status.success() {
            return Err(InstallError::InstallationError {
                exit_code: status.code(),
                output: format!("{} install exited unsuccessfully", self.elemental),
            });
        }
        info!("Installation complete");
        Ok(())
    }
}
