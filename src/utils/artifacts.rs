// file: src/utils/artifacts.rs
// version: 1.0.0
// guid: bb8110a3-ab01-4a21-8ef0-4c4cae5dfbbd

//! Temporary configuration artifacts handed to the installer
//!
//! Every artifact lives in a `tempfile` handle owned by [`InstallArtifacts`];
//! dropping the value removes all of them.

use crate::config::LlmosConfig;
use crate::installer::elemental::ElementalConfig;
use crate::stages::StagedConfig;
use crate::Result;
use std::io::Write;
use std::path::Path;
use tempfile::{Builder, NamedTempFile, TempDir};
use tracing::debug;

/// File name elemental looks for inside its config directory
pub const ELEMENTAL_CONFIG_FILE: &str = "config.yaml";

/// Scoped artifacts of one installation attempt
#[derive(Debug)]
pub struct InstallArtifacts {
    intent: NamedTempFile,
    staged: NamedTempFile,
    elemental_dir: TempDir,
}

impl InstallArtifacts {
    /// Create the intent and staged artifacts; the installer config is
    /// written later because it references the staged path.
    pub fn create(intent: &LlmosConfig, staged: &StagedConfig) -> Result<Self> {
        let intent_yaml = intent.to_yaml()?;
        let staged_yaml = staged.to_yaml()?;

        let intent = write_temp("llmos-config-", &intent_yaml)?;
        let staged = write_temp("llmos-cos-", &staged_yaml)?;
        let elemental_dir = Builder::new().prefix("llmos-elemental-").tempdir()?;

        debug!("Intent artifact: {}", intent.path().display());
        debug!("Staged artifact: {}", staged.path().display());

        Ok(Self {
            intent,
            staged,
            elemental_dir,
        })
    }

    /// Write the installer config into the elemental config directory
    pub fn write_elemental_config(&self, config: &ElementalConfig) -> Result<()> {
        let yaml = serde_yaml::to_string(config)?;
        let path = self.elemental_dir.path().join(ELEMENTAL_CONFIG_FILE);
        std::fs::write(&path, &yaml)?;
        debug!("Installer config: {}\n{}", path.display(), yaml);
        Ok(())
    }

    pub fn intent_path(&self) -> &Path {
        self.intent.path()
    }

    pub fn staged_path(&self) -> &Path {
        self.staged.path()
    }

    pub fn elemental_config_dir(&self) -> &Path {
        self.elemental_dir.path()
    }
}

fn write_temp(prefix: &str, content: &str) -> Result<NamedTempFile> {
    let mut file = Builder::new().prefix(prefix).suffix(".yaml").tempfile()?;
    file.write_all(content.as_bytes())?;
    file.flush()?;
    Ok(file)
}
