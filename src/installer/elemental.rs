// file: src/installer/elemental.rs
// version: 1.0.0
// guid: 67ed789b-5cda-4d52-ad02-2a3063269eb8

//! Installer-specific configuration consumed by `elemental install`

use super::layout::{PartitionLayout, LINUX_FS};
use crate::config::{InstallSettings, LlmosConfig};
use serde::{Deserialize, Serialize};

/// Top-level `config.yaml` read from the elemental config directory
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ElementalConfig {
    pub install: InstallSpec,
    #[serde(default, skip_serializing_if = "is_false")]
    pub reboot: bool,
    #[serde(default, skip_serializing_if = "is_false")]
    pub poweroff: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case", default)]
pub struct InstallSpec {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub target: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub partitions: Option<DefaultPartitions>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extra_partitions: Vec<Partition>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub iso: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub cloud_init: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub system: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub tty: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DefaultPartitions {
    pub oem: Partition,
    pub state: Partition,
    pub recovery: Partition,
    pub persistent: Partition,
}

/// A partition descriptor; a size of 0 lets elemental use the remaining space
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Partition {
    #[serde(rename = "label", default, skip_serializing_if = "String::is_empty")]
    pub label: String,
    #[serde(default, skip_serializing_if = "is_zero")]
    pub size: u64,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub fs: String,
}

impl Partition {
    pub fn new(label: &str, size_mib: u64) -> Self {
        Self {
            label: label.to_string(),
            size: size_mib,
            fs: LINUX_FS.to_string(),
        }
    }
}

fn is_false(value: &bool) -> bool {
    !*value
}

fn is_zero(value: &u64) -> bool {
    *value == 0
}

impl ElementalConfig {
    /// Base config for `target` carrying the install flags and sources
    pub fn new(target: &str, install: &InstallSettings) -> Self {
        Self {
            install: InstallSpec {
                target: target.to_string(),
                iso: install.iso_url.clone(),
                system: install.system_uri.clone(),
                tty: install.tty.clone(),
                ..InstallSpec::default()
            },
            reboot: install.reboot,
            poweroff: install.power_off,
        }
    }
}

/// Build the installer config for `target` with the partition `layout`.
///
/// `cloud_init` is the staged document path that replaces the user's config
/// source, which has already been merged into `config`.
pub fn generate_elemental_config(
    config: &LlmosConfig,
    target: &str,
    layout: &PartitionLayout,
    cloud_init: &str,
) -> ElementalConfig {
    let mut elemental = ElementalConfig::new(target, &config.install);
    elemental.install.cloud_init = cloud_init.to_string();
    elemental.install.partitions = Some(layout.partitions.clone());
    elemental.install.extra_partitions = layout.extra_partitions.clone();
    elemental
}
