//! Configuration schema for the restorer
//!
//! Configuration is stored at `~/.config/restorer/config.toml`

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Root configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// General settings
    pub general: GeneralConfig,

    /// Filesystem locations
    pub paths: PathsConfig,

    /// Platform settings
    pub platform: PlatformConfig,

    /// Restore behavior
    pub restore: RestoreConfig,
}

/// General application settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// Log format: "text" or "json"
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_format: "text".to_string(),
        }
    }
}

/// Filesystem locations
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathsConfig {
    /// Layers directory holding one subdirectory per buildpack
    pub layers_dir: PathBuf,

    /// Buildpack group file (default: `<layers_dir>/group.toml`)
    pub group_path: Option<PathBuf>,

    /// Analyzed metadata file (default: `<layers_dir>/analyzed.toml`)
    pub analyzed_path: Option<PathBuf>,

    /// Cache volume directory; no cache is used when unset
    pub cache_dir: Option<PathBuf>,
}

impl Default for PathsConfig {
    fn default() -> Self {
        Self {
            layers_dir: PathBuf::from("/layers"),
            group_path: None,
            analyzed_path: None,
            cache_dir: None,
        }
    }
}

impl PathsConfig {
    pub fn group_path(&self) -> PathBuf {
        self.group_path
            .clone()
            .unwrap_or_else(|| self.layers_dir.join("group.toml"))
    }

    pub fn analyzed_path(&self) -> PathBuf {
        self.analyzed_path
            .clone()
            .unwrap_or_else(|| self.layers_dir.join("analyzed.toml"))
    }
}

/// Platform settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlatformConfig {
    /// Platform API implemented by the caller
    pub api: String,
}

impl Default for PlatformConfig {
    fn default() -> Self {
        Self {
            api: "0.7".to_string(),
        }
    }
}

/// Restore behavior
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RestoreConfig {
    /// Directory cached tarballs are extracted beneath
    pub extract_root: PathBuf,

    /// Hash `sha256:` layer blobs before extracting them
    pub verify_digests: bool,
}

impl Default for RestoreConfig {
    fn default() -> Self {
        Self {
            extract_root: PathBuf::from("/"),
            verify_digests: false,
        }
    }
}
