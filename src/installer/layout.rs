// file: src/installer/layout.rs
// version: 1.0.0
// guid: a8ca2e8b-e2c3-47e1-8d63-0da3e33e79ae

//! Partition layout calculation from disk capacity

use super::elemental::{DefaultPartitions, Partition};
use crate::config::LlmosConfig;
use crate::disk::{GIB, MIB};
use crate::error::InstallError;
use crate::Result;
use tracing::debug;

/// Disks below this size are rejected outright
pub const HARD_MIN_DISK_SIZE_GIB: u64 = 80;
/// Disks from this size get the normal persistent partition
pub const SOFT_MIN_DISK_SIZE_GIB: u64 = 140;
pub const MIN_PERSISTENT_SIZE_GIB: u64 = 25;
pub const NORMAL_PERSISTENT_SIZE_GIB: u64 = 60;
pub const MAX_PERSISTENT_SIZE_GIB: u64 = 100;

pub const OEM_LABEL: &str = "COS_OEM";
pub const STATE_LABEL: &str = "COS_STATE";
pub const RECOVERY_LABEL: &str = "COS_RECOVERY";
pub const PERSISTENT_LABEL: &str = "COS_PERSISTENT";
pub const DATA_PERSISTENT_LABEL: &str = "LLMOS_DATA_PERSISTENT";
pub const LINUX_FS: &str = "ext4";

/// Partition sizes in MiB
pub const OEM_SIZE_MIB: u64 = 64;
pub const STATE_SIZE_MIB: u64 = 20480;
pub const RECOVERY_SIZE_MIB: u64 = 10240;

/// Computed layout for the root disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PartitionLayout {
    pub partitions: DefaultPartitions,
    pub extra_partitions: Vec<Partition>,
}

impl PartitionLayout {
    pub fn persistent_size_mib(&self) -> u64 {
        self.partitions.persistent.size
    }

    pub fn has_data_partition(&self) -> bool {
        !self.extra_partitions.is_empty()
    }
}

fn check_hard_minimum(disk_size_gib: u64) -> Result<()> {
    if disk_size_gib < HARD_MIN_DISK_SIZE_GIB {
        return Err(InstallError::DiskTooSmallError {
            size_gib: disk_size_gib,
            min_gib: HARD_MIN_DISK_SIZE_GIB,
        });
    }
    Ok(())
}

/// Persistent partition size in MiB for a disk of `disk_size_gib`.
///
/// Between the hard and soft minimum the size grows linearly from
/// `MIN_PERSISTENT_SIZE_GIB`; above the soft minimum it steps by 10 GiB per
/// 100 GiB of capacity, capped at `MAX_PERSISTENT_SIZE_GIB`.
pub fn compute_persistent_size_mib(disk_size_gib: u64) -> Result<u64> {
    check_hard_minimum(disk_size_gib)?;

    if disk_size_gib < SOFT_MIN_DISK_SIZE_GIB {
        let span = SOFT_MIN_DISK_SIZE_GIB - HARD_MIN_DISK_SIZE_GIB;
        let extra = (disk_size_gib - HARD_MIN_DISK_SIZE_GIB) * MIN_PERSISTENT_SIZE_GIB * 1024 / span;
        return Ok(MIN_PERSISTENT_SIZE_GIB * 1024 + extra);
    }

    let steps = (disk_size_gib - 100) / 100;
    let size_gib = (NORMAL_PERSISTENT_SIZE_GIB + steps * 10).min(MAX_PERSISTENT_SIZE_GIB);
    Ok(size_gib * 1024)
}

/// Persistent partition size in whole GiB
pub fn compute_persistent_size_gib(disk_size_gib: u64) -> Result<u64> {
    Ok(compute_persistent_size_mib(disk_size_gib)? / 1024)
}

/// Reject disks below the hard minimum, whatever the requested layout
pub fn ensure_minimum_disk_size(disk_size_bytes: u64) -> Result<()> {
    check_hard_minimum(disk_size_bytes / GIB)
}

/// Build the root disk layout for `config` on a disk of `disk_size_bytes`
pub fn build_partition_layout(config: &LlmosConfig, disk_size_bytes: u64) -> Result<PartitionLayout> {
    let disk_size_gib = disk_size_bytes / GIB;

    // written in whole GiB; the MiB curve is only finer grained
    let persistent_size_mib = if config.has_data_partition() {
        compute_persistent_size_gib(disk_size_gib)? * 1024
    } else {
        0
    };

    let partitions = DefaultPartitions {
        oem: Partition::new(OEM_LABEL, OEM_SIZE_MIB),
        state: Partition::new(STATE_LABEL, STATE_SIZE_MIB),
        recovery: Partition::new(RECOVERY_LABEL, RECOVERY_SIZE_MIB),
        persistent: Partition::new(PERSISTENT_LABEL, persistent_size_mib),
    };

    let required_mib = OEM_SIZE_MIB + STATE_SIZE_MIB + RECOVERY_SIZE_MIB + persistent_size_mib;
    if required_mib > disk_size_bytes / MIB {
        return Err(InstallError::DiskTooSmallError {
            size_gib: disk_size_gib,
            min_gib: required_mib.div_ceil(1024),
        });
    }

    let extra_partitions = if config.has_data_partition() {
        vec![Partition::new(DATA_PERSISTENT_LABEL, 0)]
    } else {
        Vec::new()
    };

    debug!(
        "Partition layout for {}GiB disk: persistent={}MiB, data partition={}",
        disk_size_gib,
        persistent_size_mib,
        !extra_partitions.is_empty()
    );

    Ok(PartitionLayout {
        partitions,
        extra_partitions,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::RunFlags;

    fn config_with_data_device(data_device: &str) -> LlmosConfig {
        let mut config = LlmosConfig::new_default(&RunFlags::default());
        config.install.device = "/dev/sda".to_string();
        config.install.data_device = data_device.to_string();
        config
    }

    #[test]
    fn test_below_hard_minimum_fails() {
        for d in [0, 1, 40, 60, 79] {
            let err = compute_persistent_size_gib(d).unwrap_err();
            assert!(matches!(
                err,
                InstallError::DiskTooSmallError { size_gib, min_gib: 80 } if size_gib == d
            ));
        }
    }

    #[test]
    fn test_interpolated_range_is_strictly_increasing() {
        assert_eq!(compute_persistent_size_gib(80).unwrap(), 25);
        let mut previous = compute_persistent_size_mib(80).unwrap();
        for d in 81..140 {
            let size = compute_persistent_size_mib(d).unwrap();
            assert!(size > previous, "size at {} not above size at {}", d, d - 1);
            previous = size;
        }
        // 139 GiB is just below the doubled minimum
        assert_eq!(compute_persistent_size_gib(139).unwrap(), 49);
    }

    #[test]
    fn test_stepped_range() {
        let cases = [
            (140, 60),
            (199, 60),
            (200, 70),
            (299, 70),
            (300, 80),
            (400, 90),
            (500, 100),
            (2000, 100),
        ];
        for (disk, expected) in cases {
            assert_eq!(compute_persistent_size_gib(disk).unwrap(), expected, "disk {}", disk);
        }
    }

    #[test]
    fn test_stepped_range_is_non_decreasing_and_capped() {
        let mut previous = compute_persistent_size_gib(140).unwrap();
        for d in 141..1500 {
            let size = compute_persistent_size_gib(d).unwrap();
            assert!(size >= previous);
            assert!(size <= MAX_PERSISTENT_SIZE_GIB);
            if size != previous {
                assert_eq!(d % 100, 0, "step at {}", d);
            }
            previous = size;
        }
    }

    #[test]
    fn test_layout_without_data_device_leaves_persistent_auto_sized() {
        let config = config_with_data_device("");
        let layout = build_partition_layout(&config, 60 * GIB).unwrap();
        assert_eq!(layout.persistent_size_mib(), 0);
        assert!(!layout.has_data_partition());
        assert_eq!(layout.partitions.oem.label, OEM_LABEL);
        assert_eq!(layout.partitions.state.size, STATE_SIZE_MIB);
        assert_eq!(layout.partitions.recovery.size, RECOVERY_SIZE_MIB);
        assert_eq!(layout.partitions.persistent.fs, LINUX_FS);
    }

    #[test]
    fn test_layout_with_data_device_on_200_gib_disk() {
        let config = config_with_data_device("/dev/sdb");
        let layout = build_partition_layout(&config, 200 * GIB).unwrap();
        assert_eq!(layout.persistent_size_mib(), 70 * 1024);
        assert_eq!(layout.extra_partitions.len(), 1);
        assert_eq!(layout.extra_partitions[0].label, DATA_PERSISTENT_LABEL);
        assert_eq!(layout.extra_partitions[0].size, 0);
    }

    #[test]
    fn test_layout_writes_whole_gib_in_interpolated_range() {
        let config = config_with_data_device("/dev/sdb");
        let layout = build_partition_layout(&config, 81 * GIB).unwrap();
        assert_eq!(layout.persistent_size_mib(), 25 * 1024);
        let layout = build_partition_layout(&config, 139 * GIB).unwrap();
        assert_eq!(layout.persistent_size_mib(), 49 * 1024);
    }

    #[test]
    fn test_layout_with_data_device_on_small_disk_fails() {
        let config = config_with_data_device("/dev/sdb");
        let err = build_partition_layout(&config, 60 * GIB).unwrap_err();
        assert!(matches!(err, InstallError::DiskTooSmallError { size_gib: 60, .. }));
    }

    #[test]
    fn test_layout_rejects_fixed_partitions_exceeding_disk() {
        let config = config_with_data_device("");
        let err = build_partition_layout(&config, 20 * GIB).unwrap_err();
        assert!(matches!(err, InstallError::DiskTooSmallError { size_gib: 20, min_gib: 31 }));
    }

    #[test]
    fn test_ensure_minimum_disk_size() {
        assert!(ensure_minimum_disk_size(80 * GIB).is_ok());
        assert!(ensure_minimum_disk_size(80 * GIB - 1).is_err());
    }
}
