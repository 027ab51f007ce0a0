// file: src/config/merge.rs
// version: 1.0.0
// guid: 320d207e-fabf-4b90-a202-f242979ea719

//! Right-biased structural merge for configuration aggregates
//!
//! Scalars from the right-hand side win only when they are non-empty (or
//! `true`), sequences are appended without deduplication, and maps take the
//! right-hand side's entries over existing keys.

use super::{InstallSettings, K3sConfig, LlmosConfig, OsSettings};
use crate::error::InstallError;
use crate::Result;
use std::collections::BTreeMap;

/// Merge another value of the same aggregate into `self`
pub trait Merge {
    fn merge(&mut self, other: &Self) -> Result<()>;
}

fn merge_string(dst: &mut String, src: &str) {
    if !src.is_empty() {
        *dst = src.to_string();
    }
}

fn merge_bool(dst: &mut bool, src: bool) {
    if src {
        *dst = true;
    }
}

fn append<T: Clone>(dst: &mut Vec<T>, src: &[T]) {
    dst.extend_from_slice(src);
}

fn merge_map(dst: &mut BTreeMap<String, String>, src: &BTreeMap<String, String>) {
    for (key, value) in src {
        dst.insert(key.clone(), value.clone());
    }
}

impl Merge for LlmosConfig {
    fn merge(&mut self, other: &Self) -> Result<()> {
        if !self.version.is_empty() && !other.version.is_empty() && self.version != other.version
        {
            return Err(InstallError::merge(format!(
                "incompatible config versions: {} and {}",
                self.version, other.version
            )));
        }

        merge_string(&mut self.version, &other.version);
        merge_string(&mut self.config_dir, &other.config_dir);
        merge_bool(&mut self.debug, other.debug);
        merge_bool(&mut self.dev_mode, other.dev_mode);
        self.os.merge(&other.os)?;
        self.install.merge(&other.install)?;
        Ok(())
    }
}

impl Merge for OsSettings {
    fn merge(&mut self, other: &Self) -> Result<()> {
        append(&mut self.ssh_authorized_keys, &other.ssh_authorized_keys);
        append(&mut self.write_files, &other.write_files);
        merge_string(&mut self.hostname, &other.hostname);
        append(&mut self.modules, &other.modules);
        merge_map(&mut self.sysctl, &other.sysctl);
        merge_string(&mut self.username, &other.username);
        merge_string(&mut self.password, &other.password);
        append(&mut self.ntp_servers, &other.ntp_servers);
        append(&mut self.dns_nameservers, &other.dns_nameservers);
        merge_map(&mut self.environment, &other.environment);
        merge_map(&mut self.labels, &other.labels);
        append(&mut self.persistent_state_paths, &other.persistent_state_paths);
        self.k3s.merge(&other.k3s)
    }
}

impl Merge for K3sConfig {
    fn merge(&mut self, other: &Self) -> Result<()> {
        merge_string(&mut self.token, &other.token);
        merge_string(&mut self.node_external_ip, &other.node_external_ip);
        append(&mut self.node_label, &other.node_label);
        Ok(())
    }
}

impl Merge for InstallSettings {
    fn merge(&mut self, other: &Self) -> Result<()> {
        merge_string(&mut self.device, &other.device);
        merge_bool(&mut self.silent, other.silent);
        merge_string(&mut self.iso_url, &other.iso_url);
        merge_string(&mut self.system_uri, &other.system_uri);
        merge_bool(&mut self.power_off, other.power_off);
        merge_bool(&mut self.debug, other.debug);
        merge_string(&mut self.tty, &other.tty);
        merge_string(&mut self.data_device, &other.data_device);
        append(&mut self.env, &other.env);
        merge_bool(&mut self.reboot, other.reboot);
        merge_string(&mut self.config_url, &other.config_url);
        merge_string(&mut self.config_dir, &other.config_dir);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RunFlags, WriteFile};

    fn populated() -> LlmosConfig {
        let mut config = LlmosConfig::new_default(&RunFlags::default());
        config.os.hostname = "node-1".to_string();
        config.os.ssh_authorized_keys = vec!["ssh-ed25519 AAAA".to_string()];
        config.os.modules = vec!["nvidia".to_string(), "kvm".to_string()];
        config.os.ntp_servers = vec!["0.pool.ntp.org".to_string()];
        config.os.sysctl.insert("vm.swappiness".to_string(), "10".to_string());
        config.os.write_files = vec![WriteFile {
            path: "/etc/motd".to_string(),
            content: "hi".to_string(),
            permissions: "0644".to_string(),
            ..WriteFile::default()
        }];
        config.os.k3s.node_label = vec!["role=gpu".to_string()];
        config.install.device = "/dev/sda".to_string();
        config.install.reboot = true;
        config.install.env = vec!["A=1".to_string()];
        config
    }

    #[test]
    fn test_merge_with_own_copy_doubles_sequences_only() {
        let original = populated();
        let mut merged = original.copy();
        merged.merge(&original).unwrap();

        // scalars and maps are unchanged
        assert_eq!(merged.version, original.version);
        assert_eq!(merged.os.hostname, original.os.hostname);
        assert_eq!(merged.os.sysctl, original.os.sysctl);
        assert_eq!(merged.install.device, original.install.device);
        assert_eq!(merged.install.reboot, original.install.reboot);

        assert_eq!(merged.os.modules, vec!["nvidia", "kvm", "nvidia", "kvm"]);
        assert_eq!(merged.os.ssh_authorized_keys.len(), 2);
        assert_eq!(merged.os.ntp_servers.len(), 2);
        assert_eq!(merged.os.write_files.len(), 2);
        assert_eq!(merged.os.write_files[0], merged.os.write_files[1]);
        assert_eq!(merged.os.k3s.node_label.len(), 2);
        assert_eq!(merged.install.env.len(), 2);
    }

    #[test]
    fn test_merge_is_right_biased_for_non_empty_scalars() {
        let mut left = populated();
        let mut right = LlmosConfig::default();
        right.os.hostname = "node-2".to_string();
        right.install.data_device = "/dev/sdb".to_string();
        right.os.sysctl.insert("vm.swappiness".to_string(), "60".to_string());
        right.os.sysctl.insert("fs.inotify.max_user_watches".to_string(), "524288".to_string());

        left.merge(&right).unwrap();

        assert_eq!(left.os.hostname, "node-2");
        assert_eq!(left.install.data_device, "/dev/sdb");
        assert_eq!(left.install.device, "/dev/sda");
        assert!(left.install.reboot);
        assert_eq!(left.os.sysctl["vm.swappiness"], "60");
        assert_eq!(left.os.sysctl.len(), 2);
    }

    #[test]
    fn test_merge_rejects_incompatible_versions() {
        let mut left = populated();
        let right = LlmosConfig {
            version: "v2.0".to_string(),
            ..LlmosConfig::default()
        };
        let err = left.merge(&right).unwrap_err();
        assert!(matches!(err, InstallError::MergeError(_)));
        assert!(err.to_string().contains("v2.0"));
    }

    #[test]
    fn test_merge_into_empty_copies_everything() {
        let source = populated();
        let mut target = LlmosConfig::default();
        target.merge(&source).unwrap();
        assert_eq!(target, source);
    }
}
