// file: src/utils/mod.rs
// version: 1.0.0
// guid: fe0910d7-1db7-42ec-a842-b737c1f0078c

//! Utility modules for system operations

pub mod artifacts;
pub mod disk;
pub mod system;

pub use artifacts::InstallArtifacts;
pub use disk::{BlockDevice, DiskProbe, LsblkProbe};
pub use system::SystemUtils;
