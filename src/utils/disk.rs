// file: src/utils/disk.rs
// version: 1.0.0
// guid: fe8cfa04-d36a-44ec-8391-82dcdd3842f4

//! Block device probing through `lsblk`

use crate::error::InstallError;
use crate::Result;
use async_trait::async_trait;
use serde::{Deserialize, Deserializer};
use tracing::debug;

/// A whole-disk block device as reported by the probe
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct BlockDevice {
    pub name: String,
    #[serde(rename = "size", default, deserialize_with = "size_from_number_or_string")]
    pub size_bytes: u64,
    #[serde(default)]
    pub model: Option<String>,
}

impl BlockDevice {
    pub fn new(name: impl Into<String>, size_bytes: u64, model: Option<&str>) -> Self {
        Self {
            name: name.into(),
            size_bytes,
            model: model.map(str::to_string),
        }
    }
}

/// Hardware probe collaborator
#[async_trait]
pub trait DiskProbe: Send + Sync {
    /// List whole-disk block devices; read-only
    async fn list_block_devices(&self) -> Result<Vec<BlockDevice>>;
}

#[derive(Deserialize)]
struct LsblkOutput {
    #[serde(default)]
    blockdevices: Vec<BlockDevice>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RawSize {
    Number(u64),
    Text(String),
}

// Older util-linux prints sizes as strings even with `-b`
fn size_from_number_or_string<'de, D>(deserializer: D) -> std::result::Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    match Option::<RawSize>::deserialize(deserializer)? {
        None => Ok(0),
        Some(RawSize::Number(n)) => Ok(n),
        Some(RawSize::Text(s)) => s.trim().parse::<u64>().map_err(serde::de::Error::custom),
    }
}

/// `lsblk`-backed probe
#[derive(Debug, Default, Clone)]
pub struct LsblkProbe;

impl LsblkProbe {
    pub fn new() -> Self {
        Self
    }

    /// Parse `lsblk -J` output
    pub fn parse_output(json: &str) -> Result<Vec<BlockDevice>> {
        let output: LsblkOutput = serde_json::from_str(json)?;
        Ok(output.blockdevices)
    }
}

#[async_trait]
impl DiskProbe for LsblkProbe {
    async fn list_block_devices(&self) -> Result<Vec<BlockDevice>> {
        let output = tokio::process::Command::new("lsblk")
            .args(["-J", "-b", "-d", "-o", "NAME,SIZE,MODEL,TYPE"])
            .output()
            .await
            .map_err(|e| InstallError::ProcessError {
                command: "lsblk".to_string(),
                exit_code: None,
                stderr: format!("Failed to execute lsblk: {}", e),
            })?;

        if !output.status.success() {
            return Err(InstallError::ProcessError {
                command: "lsblk".to_string(),
                exit_code: output.status.code(),
                stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let devices = Self::parse_output(&stdout)?;
        debug!("lsblk reported {} block devices", devices.len());
        Ok(devices)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_numeric_sizes() {
        let json = r#"{
  "blockdevices": [
    {"name": "sda", "size": 512110190592, "model": "Samsung SSD 860", "type": "disk"},
    {"name": "loop0", "size": 4096, "model": null, "type": "loop"}
  ]
}"#;
        let devices = LsblkProbe::parse_output(json).unwrap();
        assert_eq!(devices.len(), 2);
        assert_eq!(
            devices[0],
            BlockDevice::new("sda", 512110190592, Some("Samsung SSD 860"))
        );
        assert_eq!(devices[1].model, None);
    }

    #[test]
    fn test_parse_string_sizes_from_old_lsblk() {
        let json = r#"{"blockdevices": [{"name": "vda", "size": "107374182400", "type": "disk"}]}"#;
        let devices = LsblkProbe::parse_output(json).unwrap();
        assert_eq!(devices[0].size_bytes, 107374182400);
        assert_eq!(devices[0].model, None);
    }

    #[test]
    fn test_parse_missing_size_is_zero() {
        let json = r#"{"blockdevices": [{"name": "sr0", "size": null}]}"#;
        let devices = LsblkProbe::parse_output(json).unwrap();
        assert_eq!(devices[0].size_bytes, 0);
    }

    #[test]
    fn test_parse_invalid_json() {
        assert!(LsblkProbe::parse_output("not json").is_err());
    }
}
