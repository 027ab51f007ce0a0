// file: src/installer/mod.rs
// version: 1.0.0
// guid: ec128993-737b-448a-974b-9490e590708d

//! Installation orchestrator
//!
//! Drives one installation from input collection to post-install file
//! placement. Everything before [`InstallState::DeactivatingDevices`] is
//! side-effect free apart from temporary artifacts, so any failure up to that
//! point leaves the machine untouched.

pub mod backend;
pub mod elemental;
pub mod layout;
pub mod prompt;
pub mod sanitize;

use crate::config::{state_path, ConfigLoader, LlmosConfig, Merge, RunFlags};
use crate::disk::{enumerate_disks, pick_default_disk, validate_data_device, validate_device, DiskSnapshot};
use crate::error::InstallError;
use crate::stages::{after_install_chroot_stage, convert_to_stages};
use crate::utils::{DiskProbe, InstallArtifacts, LsblkProbe, SystemUtils};
use crate::Result;
use backend::{ElementalBackend, InstallRequest, InstallerBackend};
use elemental::generate_elemental_config;
use layout::{build_partition_layout, ensure_minimum_disk_size};
use prompt::{DialoguerPrompter, Prompter};
use std::path::{Path, PathBuf};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Default bound on interactive collection rounds
pub const DEFAULT_MAX_PROMPT_ATTEMPTS: usize = 10;

/// Names of the files placed into the installed config directory
pub const PLACED_INTENT_FILE: &str = "llmos-config.yaml";
pub const PLACED_STAGED_FILE: &str = "cos-config.yaml";

/// Orchestrator progress
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InstallState {
    CollectingInput,
    Validating,
    DeactivatingDevices,
    Installing,
    PlacingPostInstallFiles,
    Done,
}

impl InstallState {
    /// Whether the run may still be abandoned; once the installer starts it
    /// runs to completion
    pub fn is_interruptible(&self) -> bool {
        matches!(
            self,
            Self::CollectingInput | Self::Validating | Self::DeactivatingDevices
        )
    }
}

/// Result of a finished installation
#[derive(Debug)]
pub enum InstallOutcome {
    Completed,
    /// The system was installed but a post-install step failed
    CompletedWithWarning(InstallError),
}

impl InstallOutcome {
    pub fn warning(&self) -> Option<&InstallError> {
        match self {
            Self::Completed => None,
            Self::CompletedWithWarning(err) => Some(err),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InstallerOptions {
    pub max_prompt_attempts: usize,
    /// Mount point of the installed system
    pub target_root: PathBuf,
    /// Accept collected settings without the final confirmation
    pub force: bool,
    /// Refuse to place files unless `target_root` is a mounted filesystem
    pub require_mounted_target: bool,
}

impl Default for InstallerOptions {
    fn default() -> Self {
        Self {
            max_prompt_attempts: DEFAULT_MAX_PROMPT_ATTEMPTS,
            target_root: state_path(&["target"]),
            force: false,
            require_mounted_target: true,
        }
    }
}

/// Main installer orchestrator
pub struct Installer {
    config: LlmosConfig,
    options: InstallerOptions,
    loader: ConfigLoader,
    probe: Box<dyn DiskProbe>,
    backend: Box<dyn InstallerBackend>,
    prompter: Box<dyn Prompter>,
    state: InstallState,
    progress: Option<watch::Sender<InstallState>>,
}

impl Installer {
    /// Installer with the system probe, elemental backend and terminal prompts
    pub fn new(config: LlmosConfig, flags: RunFlags) -> Self {
        Self {
            config,
            options: InstallerOptions::default(),
            loader: ConfigLoader::new(flags),
            probe: Box::new(LsblkProbe::new()),
            backend: Box::new(ElementalBackend::new()),
            prompter: Box::new(DialoguerPrompter::new()),
            state: InstallState::CollectingInput,
            progress: None,
        }
    }

    pub fn with_options(mut self, options: InstallerOptions) -> Self {
        self.options = options;
        self
    }

    pub fn with_loader(mut self, loader: ConfigLoader) -> Self {
        self.loader = loader;
        self
    }

    pub fn with_probe(mut self, probe: Box<dyn DiskProbe>) -> Self {
        self.probe = probe;
        self
    }

    pub fn with_backend(mut self, backend: Box<dyn InstallerBackend>) -> Self {
        self.backend = backend;
        self
    }

    pub fn with_prompter(mut self, prompter: Box<dyn Prompter>) -> Self {
        self.prompter = prompter;
        self
    }

    /// Publish every state change on `progress`
    pub fn with_progress(mut self, progress: watch::Sender<InstallState>) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn state(&self) -> InstallState {
        self.state
    }

    fn set_state(&mut self, state: InstallState) {
        self.state = state;
        if let Some(progress) = &self.progress {
            progress.send_replace(state);
        }
    }

    /// The intent as currently resolved
    pub fn config(&self) -> &LlmosConfig {
        &self.config
    }

    /// Run the whole installation
    pub async fn run(&mut self) -> Result<InstallOutcome> {
        self.set_state(InstallState::CollectingInput);

        if self.config.install.silent && self.config.install.config_url.is_empty() {
            return Err(InstallError::sanitize("silent mode requires a config url"));
        }

        let devices = self.probe.list_block_devices().await?;
        let disks = enumerate_disks(&devices);
        debug!("Found {} eligible disks", disks.disks().len());

        if self.config.install.silent {
            debug!("Running in silent mode");
            let url = self.config.install.config_url.clone();
            self.config = self.overlay_on_source(&url, self.config.copy()).await?;
        } else {
            self.collect_interactive(&disks).await?;
        }

        self.resolve_devices(&disks)?;

        self.set_state(InstallState::Validating);
        sanitize::sanitize(&self.config)?;
        let device = self.config.install.device.clone();
        let disk_size = validate_device(&device, &disks)?.size_bytes;
        ensure_minimum_disk_size(disk_size)?;
        let layout = build_partition_layout(&self.config, disk_size)?;

        let after_install = after_install_chroot_stage(&self.config)?;
        let staged = convert_to_stages(&self.config, &layout, after_install)?;
        let artifacts = InstallArtifacts::create(&self.config, &staged)?;
        let staged_path = artifacts.staged_path().display().to_string();
        let elemental = generate_elemental_config(&self.config, &device, &layout, &staged_path);
        artifacts.write_elemental_config(&elemental)?;

        self.set_state(InstallState::DeactivatingDevices);
        self.backend.deactivate_devices().await?;

        self.set_state(InstallState::Installing);
        info!("Installing LLMOS to {}", device);
        let request = InstallRequest::new(artifacts.elemental_config_dir(), &self.config.install);
        self.backend.install(&request).await?;

        self.set_state(InstallState::PlacingPostInstallFiles);
        let outcome = match self.place_post_install_files(&artifacts) {
            Ok(()) => InstallOutcome::Completed,
            Err(e) => {
                warn!("{}", e);
                InstallOutcome::CompletedWithWarning(e)
            }
        };

        self.set_state(InstallState::Done);
        Ok(outcome)
    }

    /// Load `source` and lay `overrides` on top of it
    async fn overlay_on_source(&self, source: &str, overrides: LlmosConfig) -> Result<LlmosConfig> {
        let mut loaded = self.loader.load(source).await?;
        loaded.merge(&overrides)?;
        Ok(loaded)
    }

    async fn collect_interactive(&mut self, disks: &DiskSnapshot) -> Result<()> {
        self.prompter.info("Welcome to the LLMOS installer");

        for attempt in 1..=self.options.max_prompt_attempts {
            debug!("Collecting installation settings, attempt {}", attempt);
            match self.collect_once(disks).await {
                Ok(Some(accepted)) => {
                    self.config = accepted;
                    return Ok(());
                }
                Ok(None) => continue,
                Err(e) if e.is_recoverable() => {
                    self.prompter.error(&e.to_string());
                    continue;
                }
                Err(e) => return Err(e),
            }
        }

        Err(InstallError::prompt(format!(
            "no settings accepted after {} attempts",
            self.options.max_prompt_attempts
        )))
    }

    /// One collection round on a copy of the intent; `None` when rejected
    async fn collect_once(&self, disks: &DiskSnapshot) -> Result<Option<LlmosConfig>> {
        let prompter = self.prompter.as_ref();
        let mut candidate = self.config.copy();

        let device = prompt::ask_install_device(prompter, disks)?;
        let data_device = prompt::ask_data_device(prompter, disks, &device)?;
        candidate.install.device = device;
        candidate.install.data_device = data_device.unwrap_or_default();

        let url = prompt::ask_config_url(prompter, &candidate.install.config_url)?;
        candidate.install.config_url = url.clone();
        if !url.is_empty() {
            candidate = self.overlay_on_source(&url, candidate).await?;
        }

        if let Some(os) = prompt::ask_user_configs(prompter, &candidate.os)? {
            candidate.os = os;
        }

        if !self.options.force && !prompt::confirm_settings(prompter)? {
            return Ok(None);
        }
        Ok(Some(candidate))
    }

    fn resolve_devices(&mut self, disks: &DiskSnapshot) -> Result<()> {
        let install = &mut self.config.install;

        if install.wants_auto_device() {
            let disk = pick_default_disk(disks)
                .ok_or_else(|| InstallError::sanitize("no device found to install LLMOS"))?;
            info!("Selected installation device {}", disk.path);
            install.device = disk.path.clone();
        } else {
            install.device = SystemUtils::resolve_device_path(&install.device);
        }

        if !install.data_device.is_empty() {
            let data_device = SystemUtils::resolve_device_path(&install.data_device);
            install.data_device =
                validate_data_device(&data_device, &install.device, disks)?.unwrap_or_default();
        }
        Ok(())
    }

    /// Copy the intent and staged artifacts into the installed config dir
    fn place_post_install_files(&self, artifacts: &InstallArtifacts) -> Result<()> {
        let target_root = &self.options.target_root;
        if self.options.require_mounted_target && !SystemUtils::is_mount_point(target_root) {
            return Err(InstallError::PostInstallPlacementError(format!(
                "{} is not a mounted installation target",
                target_root.display()
            )));
        }

        let config_dir = self.config.config_dir.trim_start_matches('/');
        let destination = target_root.join(config_dir);

        let place = |src: &Path, name: &str| -> std::io::Result<()> {
            std::fs::create_dir_all(&destination)?;
            std::fs::copy(src, destination.join(name))?;
            Ok(())
        };

        place(artifacts.intent_path(), PLACED_INTENT_FILE)
            .and_then(|_| place(artifacts.staged_path(), PLACED_STAGED_FILE))
            .map_err(|e| {
                InstallError::PostInstallPlacementError(format!(
                    "{}: {}",
                    destination.display(),
                    e
                ))
            })?;

        debug!("Placed post-install files into {}", destination.display());
        Ok(())
    }
}
