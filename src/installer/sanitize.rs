// file: src/installer/sanitize.rs
// version: 1.0.0
// guid: 278c8aa9-afa3-4eb5-9db8-977c6e3a64c0

//! Last checks on the resolved intent before anything destructive runs

use crate::config::{LlmosConfig, AUTO_DEVICE};
use crate::error::InstallError;
use crate::Result;
use regex::Regex;
use std::sync::OnceLock;

const DEVICE_PREFIX: &str = "/dev/";

fn hostname_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        // RFC 1123: dot separated labels of alphanumerics and inner hyphens
        Regex::new(r"^[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?(\.[A-Za-z0-9]([A-Za-z0-9-]{0,61}[A-Za-z0-9])?)*$")
            .unwrap_or_else(|e| unreachable!("hostname pattern is valid: {}", e))
    })
}

/// Whether `hostname` is a valid RFC 1123 host name
pub fn is_valid_hostname(hostname: &str) -> bool {
    hostname.len() <= 253 && hostname_pattern().is_match(hostname)
}

/// Reject intents the installer must never act on
pub fn sanitize(config: &LlmosConfig) -> Result<()> {
    let install = &config.install;

    if install.device.is_empty() || install.device == AUTO_DEVICE {
        return Err(InstallError::sanitize(
            "no installation device resolved",
        ));
    }

    if !install.device.starts_with(DEVICE_PREFIX) {
        return Err(InstallError::sanitize(format!(
            "device {} is not under {}",
            install.device, DEVICE_PREFIX
        )));
    }

    if install.silent && install.config_url.is_empty() {
        return Err(InstallError::sanitize(
            "silent mode requires a config url",
        ));
    }

    if !config.os.hostname.is_empty() && !is_valid_hostname(&config.os.hostname) {
        return Err(InstallError::sanitize(format!(
            "invalid hostname: {}",
            config.os.hostname
        )));
    }

    if !install.data_device.is_empty() && install.data_device == install.device {
        return Err(InstallError::sanitize(format!(
            "data device {} is the installation device",
            install.data_device
        )));
    }

    Ok(())
}
