// file: src/config/loader.rs
// version: 1.0.0
// guid: 614379d3-9b2b-484e-9579-a6b266067a9b

//! Configuration source loading from local paths or remote URLs

use super::{LlmosConfig, RunFlags};
use crate::error::InstallError;
use crate::network::ConfigFetcher;
use crate::Result;
use std::path::PathBuf;
use tracing::debug;
use url::Url;

/// Where an intent document is read from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    Local(PathBuf),
    Remote(Url),
}

impl ConfigSource {
    /// Classify a path-or-URL string; `~` is expanded for local paths
    pub fn parse(source: &str) -> Result<Self> {
        let source = source.trim();
        if source.is_empty() {
            return Err(InstallError::config("config source is empty"));
        }

        if let Ok(url) = Url::parse(source) {
            match url.scheme() {
                "http" | "https" => return Ok(Self::Remote(url)),
                "file" => {
                    return url.to_file_path().map(Self::Local).map_err(|_| {
                        InstallError::config(format!("invalid file url: {}", source))
                    })
                }
                _ => {}
            }
        }

        let expanded = shellexpand::tilde(source);
        Ok(Self::Local(PathBuf::from(expanded.as_ref())))
    }

    /// Parse and make sure a local source actually exists
    pub fn validate(source: &str) -> Result<Self> {
        let parsed = Self::parse(source)?;
        if let Self::Local(path) = &parsed {
            if !path.is_file() {
                return Err(InstallError::config(format!(
                    "config file {} does not exist",
                    path.display()
                )));
            }
        }
        Ok(parsed)
    }
}

/// Loads intent documents and overlays them on the run defaults
pub struct ConfigLoader {
    flags: RunFlags,
    fetcher: ConfigFetcher,
}

impl ConfigLoader {
    /// Create a new config loader
    pub fn new(flags: RunFlags) -> Self {
        Self {
            flags,
            fetcher: ConfigFetcher::new(),
        }
    }

    /// Create a loader with a custom fetcher (retry policy)
    pub fn with_fetcher(flags: RunFlags, fetcher: ConfigFetcher) -> Self {
        Self { flags, fetcher }
    }

    /// Read and parse an intent document
    pub async fn load(&self, source: &str) -> Result<LlmosConfig> {
        let bytes = self.read_source(source).await?;
        LlmosConfig::from_yaml(&bytes, &self.flags)
    }

    /// Read raw bytes from a local file or remote URL
    pub async fn read_source(&self, source: &str) -> Result<Vec<u8>> {
        match ConfigSource::parse(source)? {
            ConfigSource::Local(path) => {
                debug!("Reading local config file: {}", path.display());
                tokio::fs::read(&path).await.map_err(|e| {
                    InstallError::config(format!(
                        "error reading local LLMOS config file {}: {}",
                        path.display(),
                        e
                    ))
                })
            }
            ConfigSource::Remote(url) => {
                debug!("Fetching remote config: {}", url);
                self.fetcher.fetch(url.as_str()).await.map_err(|e| {
                    InstallError::config(format!(
                        "error reading LLMOS config file from url: {}",
                        e
                    ))
                })
            }
        }
    }
}
