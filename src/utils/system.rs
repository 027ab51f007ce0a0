// file: src/utils/system.rs
// version: 1.0.0
// guid: c714be53-e5f3-4c25-8691-3937762e9b59

//! System utility functions

use std::os::unix::fs::MetadataExt;
use std::path::Path;
use tracing::{debug, warn};

/// Tools the installer shells out to
pub const REQUIRED_TOOLS: [&str; 3] = ["elemental", "blkdeactivate", "lsblk"];

/// System utility functions
pub struct SystemUtils;

impl SystemUtils {
    /// Check if running as root
    pub fn is_root() -> bool {
        // SAFETY: getuid has no preconditions and cannot fail
        unsafe { libc::getuid() == 0 }
    }

    /// Names of required tools missing from PATH
    pub fn missing_tools() -> Vec<String> {
        let missing: Vec<String> = REQUIRED_TOOLS
            .iter()
            .filter(|tool| which::which(tool).is_err())
            .map(|tool| tool.to_string())
            .collect();
        for tool in &missing {
            warn!("Required tool not found: {}", tool);
        }
        missing
    }

    /// Whether `path` is the root of a mounted filesystem
    pub fn is_mount_point(path: &Path) -> bool {
        let Ok(path) = path.canonicalize() else {
            return false;
        };
        let Some(parent) = path.parent() else {
            return true;
        };
        match (std::fs::metadata(&path), std::fs::metadata(parent)) {
            (Ok(meta), Ok(parent_meta)) => {
                meta.dev() != parent_meta.dev() || meta.ino() == parent_meta.ino()
            }
            _ => false,
        }
    }

    /// Follow symlinks such as `/dev/disk/by-id/...` when the path exists
    pub fn resolve_device_path(device: &str) -> String {
        let path = Path::new(device);
        if !path.exists() {
            return device.to_string();
        }
        match std::fs::canonicalize(path) {
            Ok(resolved) => {
                let resolved = resolved.display().to_string();
                if resolved != device {
                    debug!("Resolved device {} to {}", device, resolved);
                }
                resolved
            }
            Err(e) => {
                warn!("Failed to resolve device path {}: {}", device, e);
                device.to_string()
            }
        }
    }
}
