// file: src/disk/mod.rs
// version: 1.0.0
// guid: 6ab59a1f-5e7c-40d4-a9aa-6bbcc3f22372

//! Disk selection over a captured snapshot of probed block devices
//!
//! Everything here is pure: the probe runs once, and selection, defaulting and
//! validation operate on the resulting [`DiskSnapshot`].

use crate::error::InstallError;
use crate::utils::disk::BlockDevice;
use crate::Result;

pub const MIB: u64 = 1 << 20;
pub const GIB: u64 = 1 << 30;

/// Device name prefixes that are never installation targets
const IGNORED_PREFIXES: [&str; 4] = ["loop", "ram", "sr", "zram"];

/// An eligible installation disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Disk {
    /// Device path, e.g. `/dev/sda`
    pub path: String,
    /// Human readable label shown when choosing a disk
    pub label: String,
    pub size_bytes: u64,
}

impl Disk {
    /// Whole GiB, truncated
    pub fn size_gib(&self) -> u64 {
        self.size_bytes / GIB
    }
}

/// Disks captured from a single probe, in enumeration order
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DiskSnapshot {
    disks: Vec<Disk>,
}

impl DiskSnapshot {
    pub fn new(disks: Vec<Disk>) -> Self {
        Self { disks }
    }

    pub fn disks(&self) -> &[Disk] {
        &self.disks
    }

    pub fn get(&self, path: &str) -> Option<&Disk> {
        self.disks.iter().find(|d| d.path == path)
    }

    pub fn paths(&self) -> impl Iterator<Item = &String> {
        self.disks.iter().map(|d| &d.path)
    }
}

/// Filter probed devices down to eligible disks
pub fn enumerate_disks(devices: &[BlockDevice]) -> DiskSnapshot {
    let disks = devices
        .iter()
        .filter(|dev| !IGNORED_PREFIXES.iter().any(|p| dev.name.starts_with(p)))
        .map(|dev| {
            let path = format!("/dev/{}", dev.name);
            let model = dev.model.as_deref().map(str::trim).unwrap_or("");
            let label = format!(
                "{}: {}({:.2} GiB)",
                path,
                model,
                dev.size_bytes as f64 / GIB as f64
            );
            Disk {
                path,
                label,
                size_bytes: dev.size_bytes,
            }
        })
        .collect();
    DiskSnapshot::new(disks)
}

/// Largest disk wins; the first one encountered wins a tie
pub fn pick_default_disk(snapshot: &DiskSnapshot) -> Option<&Disk> {
    snapshot
        .disks()
        .iter()
        .fold(None, |best: Option<&Disk>, disk| match best {
            Some(b) if b.size_bytes >= disk.size_bytes => Some(b),
            _ if disk.size_bytes == 0 => best,
            _ => Some(disk),
        })
}

/// Fail with `InvalidDeviceError` unless `chosen` was probed
pub fn validate_device<'a>(chosen: &str, available: &'a DiskSnapshot) -> Result<&'a Disk> {
    available
        .get(chosen)
        .ok_or_else(|| InstallError::invalid_device(chosen, available.paths()))
}

/// Validate the optional data device; equal to the root device means unset
pub fn validate_data_device(
    chosen: &str,
    root_device: &str,
    available: &DiskSnapshot,
) -> Result<Option<String>> {
    if chosen.is_empty() || chosen == root_device {
        return Ok(None);
    }
    validate_device(chosen, available)?;
    Ok(Some(chosen.to_string()))
}
