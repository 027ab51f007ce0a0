// file: src/error.rs
// version: 1.0.0
// guid: 344596ad-fb0e-4129-9a83-db814f236d24

//! Error types for the LLMOS installer

use thiserror::Error;

/// Result type alias for the installer
pub type Result<T> = std::result::Result<T, InstallError>;

/// Errors raised while synthesizing configuration or running an installation
#[derive(Error, Debug)]
pub enum InstallError {
    #[error("invalid device name: {device} (available: {available})")]
    InvalidDeviceError { device: String, available: String },

    #[error("disk too small: {size_gib}GiB. Minimum {min_gib}GiB is required")]
    DiskTooSmallError { size_gib: u64, min_gib: u64 },

    #[error("Merge error: {0}")]
    MergeError(String),

    #[error("Sanitize error: {0}")]
    SanitizeError(String),

    #[error("deactivating LVM and MD devices failed: {output}")]
    DeactivationError { output: String },

    #[error("installation failed with exit code {exit_code:?}: {output}")]
    InstallationError {
        exit_code: Option<i32>,
        output: String,
    },

    #[error("installation completed but post-install files were not placed: {0}")]
    PostInstallPlacementError(String),

    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("Network error: {0}")]
    NetworkError(String),

    #[error("Prompt error: {0}")]
    PromptError(String),

    #[error("Process error: command '{command}' failed with exit code {exit_code:?}: {stderr}")]
    ProcessError {
        command: String,
        exit_code: Option<i32>,
        stderr: String,
    },

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("YAML error: {0}")]
    YamlError(#[from] serde_yaml::Error),

    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl InstallError {
    /// Create a new invalid device error
    pub fn invalid_device<'a>(
        device: impl Into<String>,
        available: impl IntoIterator<Item = &'a String>,
    ) -> Self {
        let mut names: Vec<&str> = available.into_iter().map(String::as_str).collect();
        names.sort_unstable();
        Self::InvalidDeviceError {
            device: device.into(),
            available: if names.is_empty() {
                "none".to_string()
            } else {
                names.join(", ")
            },
        }
    }

    /// Create a new merge error
    pub fn merge(msg: impl Into<String>) -> Self {
        Self::MergeError(msg.into())
    }

    /// Create a new sanitize error
    pub fn sanitize(msg: impl Into<String>) -> Self {
        Self::SanitizeError(msg.into())
    }

    /// Create a new configuration error
    pub fn config(msg: impl Into<String>) -> Self {
        Self::ConfigError(msg.into())
    }

    /// Create a new network error
    pub fn network(msg: impl Into<String>) -> Self {
        Self::NetworkError(msg.into())
    }

    /// Create a new prompt error
    pub fn prompt(msg: impl Into<String>) -> Self {
        Self::PromptError(msg.into())
    }

    /// Failures after the point of no return; the install itself succeeded.
    pub fn is_warning(&self) -> bool {
        matches!(self, Self::PostInstallPlacementError(_))
    }

    /// Whether interactive collection may re-prompt instead of aborting
    pub fn is_recoverable(&self) -> bool {
        matches!(self, Self::InvalidDeviceError { .. })
    }
}

impl From<reqwest::Error> for InstallError {
    fn from(err: reqwest::Error) -> Self {
        Self::NetworkError(err.to_string())
    }
}

impl From<dialoguer::Error> for InstallError {
    fn from(err: dialoguer::Error) -> Self {
        Self::PromptError(err.to_string())
    }
}
