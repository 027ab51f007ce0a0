// file: src/lib.rs
// version: 1.0.0
// guid: 8d1c0a57-7a3e-4f0e-9a6d-2f4b1c9e3d21

//! # LLMOS Installer
//!
//! Synthesizes the machine-specific installation configuration for LLMOS and
//! hands it to the `elemental` installer.
//!
//! The installation intent ([`config::LlmosConfig`]) is merged from the command
//! line, an optional config document and interactive answers. The target disk
//! is probed and validated ([`disk`]), a size-aware partition layout is derived
//! ([`installer::layout`]) and the intent is rendered into a staged cOS
//! document ([`stages`]) before [`installer::Installer`] runs the external
//! installer.

pub mod cli;
pub mod config;
pub mod disk;
pub mod error;
pub mod installer;
pub mod logging;
pub mod network;
pub mod stages;
pub mod utils;

pub use error::{InstallError, Result};

/// Version information for the installer
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
