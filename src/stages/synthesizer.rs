// file: src/stages/synthesizer.rs
// version: 1.0.0
// guid: 27e94073-025c-4c5c-b7a1-62cbb260cd94

//! Conversion of the merged installation intent into the staged document

use super::templates::{render_k3s_config, render_manifests, rootfs_stage};
use super::{
    Directory, File, Stage, StagedConfig, User, AFTER_INSTALL_CHROOT_STAGE, INITRAMFS_STAGE,
    NETWORK_STAGE, ROOTFS_STAGE,
};
use crate::config::{LlmosConfig, DEFAULT_CONFIG_DIR};
use crate::installer::layout::PartitionLayout;
use crate::Result;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use std::path::Path;
use tracing::{debug, warn};

pub const STAGED_CONFIG_NAME: &str = "LLMOS Installer Configuration";

pub const K3S_CONFIG_DIR: &str = "/etc/rancher/k3s/config.yaml.d";
pub const K3S_CUSTOM_CONFIG: &str = "90_custom.yaml";
pub const K3S_MANIFEST_PATH: &str = "/var/lib/rancher/k3s/server/manifests/";

/// Installed copy of the intent document
pub const INSTALLED_CONFIG_FILE: &str = "llmos-config.yaml";

const NTP_SERVICE: &str = "systemd-timesyncd";
const TIME_WAIT_SYNC_SERVICE: &str = "systemd-time-wait-sync";
const USER_GROUPS: [&str; 2] = ["admin", "systemd-journal"];
const USER_PRIMARY_GROUP: &str = "llmos";
const DEFAULT_FILE_PERMISSIONS: u32 = 0o600;

/// Render `config` into the four-stage document.
///
/// `after_install` is appended under `after-install-chroot` as given.
pub fn convert_to_stages(
    config: &LlmosConfig,
    layout: &PartitionLayout,
    after_install: Stage,
) -> Result<StagedConfig> {
    let mut doc = StagedConfig::new(STAGED_CONFIG_NAME);
    doc.add_stage(ROOTFS_STAGE, rootfs_stage(config, layout));
    doc.add_stage(INITRAMFS_STAGE, initramfs_stage(config)?);
    doc.add_stage(NETWORK_STAGE, network_stage(config));
    doc.add_stage(AFTER_INSTALL_CHROOT_STAGE, after_install);

    debug!(
        "Synthesized staged config with stages: {:?}",
        doc.stages.names().collect::<Vec<_>>()
    );
    Ok(doc)
}

fn initramfs_stage(config: &LlmosConfig) -> Result<Stage> {
    let os = &config.os;
    let mut stage = Stage::default();

    add_k3s_config(config, &mut stage)?;
    add_manifests(config, &mut stage)?;

    let username = config.login_username();
    stage.users.insert(
        username.to_string(),
        User {
            password_hash: os.password.clone(),
            groups: USER_GROUPS.iter().map(|g| g.to_string()).collect(),
            primary_group: USER_PRIMARY_GROUP.to_string(),
            homedir: format!("/home/{}", username),
        },
    );

    // modprobe instead of the installer's module list, which is applied too late
    stage.commands = os.modules.iter().map(|m| format!("modprobe {}", m)).collect();

    stage.sysctl = os.sysctl.clone();
    stage.environment = os.environment.clone();

    for write_file in &os.write_files {
        stage.files.push(File {
            path: write_file.path.clone(),
            content: write_file.content.clone(),
            encoding: write_file.encoding.clone(),
            permissions: parse_permissions(&write_file.path, &write_file.permissions),
            owner_string: write_file.owner.clone(),
            ..File::default()
        });
    }

    stage.hostname = os.hostname.clone();

    if !os.ntp_servers.is_empty() {
        stage
            .timesyncd
            .insert("NTP".to_string(), os.ntp_servers.join(" "));
        stage.systemctl.enable.push(NTP_SERVICE.to_string());
        stage.systemctl.enable.push(TIME_WAIT_SYNC_SERVICE.to_string());
    }

    stage.dns.nameservers = os.dns_nameservers.clone();

    Ok(stage)
}

fn parse_permissions(path: &str, raw: &str) -> u32 {
    match u32::from_str_radix(raw.trim(), 8) {
        Ok(mode) => mode,
        Err(e) => {
            warn!(
                "Invalid permissions {:?} for {}, using {:o}: {}",
                raw, path, DEFAULT_FILE_PERMISSIONS, e
            );
            DEFAULT_FILE_PERMISSIONS
        }
    }
}

fn add_k3s_config(config: &LlmosConfig, stage: &mut Stage) -> Result<()> {
    stage
        .directories
        .push(Directory::root_owned(K3S_CONFIG_DIR, 0o600));
    stage.files.push(File::root_owned(
        format!("{}/{}", K3S_CONFIG_DIR, K3S_CUSTOM_CONFIG),
        render_k3s_config(config)?,
        0o600,
    ));
    Ok(())
}

fn add_manifests(config: &LlmosConfig, stage: &mut Stage) -> Result<()> {
    for (name, content) in render_manifests(config)? {
        let path = Path::new(K3S_MANIFEST_PATH).join(name);
        stage
            .files
            .push(File::root_owned(path.display().to_string(), content, 0o600));
    }
    Ok(())
}

fn network_stage(config: &LlmosConfig) -> Stage {
    let mut stage = Stage::default();
    if !config.os.ssh_authorized_keys.is_empty() {
        stage.authorized_keys.insert(
            config.login_username().to_string(),
            config.os.ssh_authorized_keys.clone(),
        );
    }
    stage
}

/// Stage that persists the intent onto the installed system
pub fn after_install_chroot_stage(config: &LlmosConfig) -> Result<Stage> {
    let yaml = config.to_yaml()?;
    let target = Path::new(DEFAULT_CONFIG_DIR).join(INSTALLED_CONFIG_FILE);

    Ok(Stage {
        name: "Copy files after installation".to_string(),
        directories: vec![Directory::root_owned(DEFAULT_CONFIG_DIR, 0o600)],
        files: vec![File {
            encoding: "base64".to_string(),
            ..File::root_owned(
                target.display().to_string(),
                STANDARD.encode(yaml.as_bytes()),
                0o600,
            )
        }],
        ..Stage::default()
    })
}
