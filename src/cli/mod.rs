// file: src/cli/mod.rs
// version: 1.0.0
// guid: 916cda4d-7986-4f5c-a68f-b7277a2a2da9

//! Command line interface for the LLMOS installer

pub mod args;
pub mod commands;

pub use args::{Cli, Commands, InstallArgs};
pub use commands::{install_command, run_interruptible, version_command};
