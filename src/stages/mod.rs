// file: src/stages/mod.rs
// version: 1.0.0
// guid: bf4a1ff5-aca8-44ad-8f0f-35867afbe6bf

//! Staged configuration document consumed by the cOS/yip stage runner
//!
//! The document is an ordered mapping from stage name to stage bodies. Bodies
//! added under an existing stage name are appended, so independently built
//! pieces compose without replacing each other.

pub mod synthesizer;
pub mod templates;

pub use synthesizer::{after_install_chroot_stage, convert_to_stages};

use serde::ser::{SerializeMap, Serializer};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

pub const ROOTFS_STAGE: &str = "rootfs";
pub const INITRAMFS_STAGE: &str = "initramfs";
pub const NETWORK_STAGE: &str = "network";
pub const AFTER_INSTALL_CHROOT_STAGE: &str = "after-install-chroot";

/// Named staged configuration document
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct StagedConfig {
    pub name: String,
    pub stages: StageMap,
}

impl StagedConfig {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            stages: StageMap::default(),
        }
    }

    /// Append `stage` under `name`, creating the stage on first use
    pub fn add_stage(&mut self, name: &str, stage: Stage) {
        self.stages.push(name, stage);
    }

    pub fn stage(&self, name: &str) -> Option<&[Stage]> {
        self.stages.get(name)
    }

    pub fn to_yaml(&self) -> crate::Result<String> {
        Ok(serde_yaml::to_string(self)?)
    }
}

/// Stage name to bodies, kept in insertion order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StageMap {
    entries: Vec<(String, Vec<Stage>)>,
}

impl StageMap {
    fn push(&mut self, name: &str, stage: Stage) {
        match self.entries.iter_mut().find(|(n, _)| n == name) {
            Some((_, bodies)) => bodies.push(stage),
            None => self.entries.push((name.to_string(), vec![stage])),
        }
    }

    pub fn get(&self, name: &str) -> Option<&[Stage]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, bodies)| bodies.as_slice())
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(n, _)| n.as_str())
    }
}

impl Serialize for StageMap {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, bodies) in &self.entries {
            map.serialize_entry(name, bodies)?;
        }
        map.end()
    }
}

/// One body of a stage
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Stage {
    #[serde(skip_serializing_if = "String::is_empty")]
    pub name: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub directories: Vec<Directory>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub files: Vec<File>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub users: BTreeMap<String, User>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub authorized_keys: BTreeMap<String, Vec<String>>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub sysctl: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub environment: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub environment_file: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub hostname: String,
    #[serde(skip_serializing_if = "BTreeMap::is_empty")]
    pub timesyncd: BTreeMap<String, String>,
    #[serde(skip_serializing_if = "Systemctl::is_empty")]
    pub systemctl: Systemctl,
    #[serde(skip_serializing_if = "Dns::is_empty")]
    pub dns: Dns,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub commands: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Directory {
    pub path: String,
    pub permissions: u32,
    pub owner: u32,
    pub group: u32,
}

impl Directory {
    /// Root-owned directory with the given mode
    pub fn root_owned(path: impl Into<String>, permissions: u32) -> Self {
        Self {
            path: path.into(),
            permissions,
            owner: 0,
            group: 0,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct File {
    pub path: String,
    pub permissions: u32,
    pub owner: u32,
    pub group: u32,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub content: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub encoding: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub owner_string: String,
}

impl File {
    /// Root-owned file with the given mode
    pub fn root_owned(path: impl Into<String>, content: impl Into<String>, permissions: u32) -> Self {
        Self {
            path: path.into(),
            content: content.into(),
            permissions,
            ..Self::default()
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct User {
    #[serde(rename = "passwd", skip_serializing_if = "String::is_empty")]
    pub password_hash: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub groups: Vec<String>,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub primary_group: String,
    #[serde(skip_serializing_if = "String::is_empty")]
    pub homedir: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Systemctl {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub enable: Vec<String>,
}

impl Systemctl {
    pub fn is_empty(&self) -> bool {
        self.enable.is_empty()
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Dns {
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub nameservers: Vec<String>,
}

impl Dns {
    pub fn is_empty(&self) -> bool {
        self.nameservers.is_empty()
    }
}
