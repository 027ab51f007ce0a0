// file: src/config/mod.rs
// version: 1.0.0
// guid: 6881640c-2a70-4536-a973-03f6d3f01ce5

//! Configuration module for the LLMOS installer
//!
//! Holds the installation intent (`LlmosConfig`) with its OS customization and
//! install settings, plus the run flags that seed its defaults.

pub mod loader;
pub mod merge;

pub use loader::{ConfigLoader, ConfigSource};
pub use merge::Merge;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Schema version written into every intent document
pub const DEFAULT_VERSION: &str = "v1.0";

/// Persistent configuration directory of an installed system
pub const DEFAULT_CONFIG_DIR: &str = "/etc/llmos";

/// Persistent LLMOS installation data
pub const DEFAULT_LOCAL_DIR: &str = "/var/lib/llmos";

/// Ephemeral cOS state directory
pub const DEFAULT_STATE_DIR: &str = "/run/cos";

/// Sentinel device meaning "pick the largest disk"
pub const AUTO_DEVICE: &str = "auto";

/// Join path elements under the persistent configuration directory
pub fn config_path(elem: &[&str]) -> PathBuf {
    elem.iter()
        .fold(PathBuf::from(DEFAULT_CONFIG_DIR), |path, e| path.join(e))
}

/// Join path elements under the persistent local directory
pub fn local_path(elem: &[&str]) -> PathBuf {
    elem.iter()
        .fold(PathBuf::from(DEFAULT_LOCAL_DIR), |path, e| path.join(e))
}

/// Join path elements under the ephemeral state directory
pub fn state_path(elem: &[&str]) -> PathBuf {
    elem.iter()
        .fold(PathBuf::from(DEFAULT_STATE_DIR), |path, e| path.join(e))
}

/// Process-wide flags parsed once from the command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunFlags {
    pub debug: bool,
    pub dev_mode: bool,
    pub config_dir: String,
}

impl Default for RunFlags {
    fn default() -> Self {
        Self {
            debug: false,
            dev_mode: false,
            config_dir: config_path(&["config.d"]).display().to_string(),
        }
    }
}

/// Complete installation intent
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct LlmosConfig {
    pub version: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config_dir: String,
    #[serde(skip_serializing_if = "is_false")]
    pub debug: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub dev_mode: bool,
    pub os: OsSettings,
    pub install: InstallSettings,
}

/// OS customization applied to the installed system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct OsSettings {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ssh_authorized_keys: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub write_files: Vec<WriteFile>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub modules: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctl: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub username: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub password: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub ntp_servers: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub dns_nameservers: Vec<String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub persistent_state_paths: Vec<String>,
    #[serde(flatten)]
    pub k3s: K3sConfig,
}

/// Cluster bootstrap settings inlined into the OS section
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct K3sConfig {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub token: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub node_external_ip: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub node_label: Vec<String>,
}

/// A file dropped onto the installed system
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriteFile {
    pub encoding: String,
    pub content: String,
    pub owner: String,
    pub path: String,
    /// Octal permission string such as `"0644"`
    pub permissions: String,
}

/// Settings that drive the installer itself
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InstallSettings {
    pub device: String,
    #[serde(skip_serializing_if = "is_false")]
    pub silent: bool,
    #[serde(rename = "iso", skip_serializing_if = "String::is_empty")]
    pub iso_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system_uri: String,
    #[serde(rename = "poweroff", skip_serializing_if = "is_false")]
    pub power_off: bool,
    #[serde(skip_serializing_if = "is_false")]
    pub debug: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tty: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub data_device: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub env: Vec<String>,
    #[serde(skip_serializing_if = "is_false")]
    pub reboot: bool,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config_url: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub config_dir: String,
}

fn is_false(value: &bool) -> bool {
    !*value
}

impl LlmosConfig {
    /// Create an intent with safe zero values and the run flags applied
    pub fn new_default(flags: &RunFlags) -> Self {
        Self {
            version: DEFAULT_VERSION.to_string(),
            config_dir: flags.config_dir.clone(),
            debug: flags.debug,
            dev_mode: flags.dev_mode,
            os: OsSettings::default(),
            install: InstallSettings {
                debug: flags.debug,
                ..InstallSettings::default()
            },
        }
    }

    /// Parse a YAML document on top of the defaults for `flags`
    pub fn from_yaml(bytes: &[u8], flags: &RunFlags) -> crate::Result<Self> {
        let parsed: LlmosConfig = serde_yaml::from_slice(bytes).map_err(|e| {
            crate::error::InstallError::config(format!("failed to unmarshal yaml: {}", e))
        })?;
        let mut config = Self::new_default(flags);
        config.merge(&parsed)?;
        Ok(config)
    }

    /// Serialize the intent as YAML
    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }

    /// Fully independent duplicate, safe to hand to an editor
    pub fn copy(&self) -> Self {
        self.clone()
    }

    pub fn has_data_partition(&self) -> bool {
        !self.install.data_device.is_empty()
    }

    pub fn k3s_node_labels(&self) -> &[String] {
        &self.os.k3s.node_label
    }

    pub fn k3s_disabled_components(&self) -> Vec<String> {
        vec!["cloud-controller".to_string()]
    }

    pub fn k3s_node_external_ip(&self) -> &str {
        &self.os.k3s.node_external_ip
    }

    /// Login user, falling back to the default account name
    pub fn login_username(&self) -> &str {
        if self.os.username.is_empty() {
            DEFAULT_USERNAME
        } else {
            &self.os.username
        }
    }
}

/// Account created when no username is configured
pub const DEFAULT_USERNAME: &str = "llmos";

impl OsSettings {
    /// Users are considered configured once both keys and a password exist
    pub fn has_login_configured(&self) -> bool {
        !self.ssh_authorized_keys.is_empty() && !self.password.is_empty()
    }
}

impl InstallSettings {
    /// Parse `KEY=VALUE` overrides, skipping malformed entries
    pub fn env_pairs(&self) -> Vec<(String, String)> {
        self.env
            .iter()
            .filter_map(|entry| {
                let (key, value) = entry.split_once('=')?;
                if key.is_empty() {
                    return None;
                }
                Some((key.to_string(), value.to_string()))
            })
            .collect()
    }

    pub fn wants_auto_device(&self) -> bool {
        self.device.is_empty() || self.device == AUTO_DEVICE
    }
}
