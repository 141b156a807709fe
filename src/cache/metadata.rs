//! Layer metadata recorded by previous builds
//!
//! The same shape is used for the cache manifest (JSON, stored next to
//! the cached layer blobs) and for the app image's layer metadata that the
//! platform hands over in `analyzed.toml`.

use crate::error::{RestorerError, RestorerResult};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;
use tracing::debug;

/// Per-layer entry
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayerMetadata {
    /// Content checksum of the layer tarball (diff ID)
    #[serde(default)]
    pub sha: String,

    /// Buildpack-provided metadata table
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,

    #[serde(default)]
    pub build: bool,

    #[serde(default)]
    pub launch: bool,

    #[serde(default)]
    pub cache: bool,
}

/// Layers recorded for one buildpack
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BuildpackLayersMetadata {
    /// Buildpack ID
    #[serde(rename = "key")]
    pub id: String,

    #[serde(default)]
    pub version: String,

    #[serde(default)]
    pub layers: BTreeMap<String, LayerMetadata>,
}

/// Layers recorded for every buildpack of a build
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LayersMetadata {
    #[serde(default)]
    pub buildpacks: Vec<BuildpackLayersMetadata>,
}

/// The resolved cache manifest
pub type CacheMetadata = LayersMetadata;

static NO_LAYERS: BTreeMap<String, LayerMetadata> = BTreeMap::new();

impl LayersMetadata {
    /// Metadata for a buildpack, if anything was recorded for it
    pub fn for_buildpack(&self, id: &str) -> Option<&BuildpackLayersMetadata> {
        self.buildpacks.iter().find(|bp| bp.id == id)
    }

    /// Layers recorded for a buildpack; empty when the buildpack is unknown
    pub fn layers_for(&self, id: &str) -> &BTreeMap<String, LayerMetadata> {
        self.for_buildpack(id).map(|bp| &bp.layers).unwrap_or(&NO_LAYERS)
    }

    pub fn is_empty(&self) -> bool {
        self.buildpacks.iter().all(|bp| bp.layers.is_empty())
    }

    /// Parse cache metadata JSON
    pub fn from_json(content: &str) -> RestorerResult<Self> {
        Ok(serde_json::from_str(content)?)
    }

    /// Load the app image's layer metadata from `analyzed.toml`.
    ///
    /// A missing file means there is no previous image.
    pub async fn from_analyzed_file(path: &Path) -> RestorerResult<Self> {
        let content = match tokio::fs::read_to_string(path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No analyzed metadata at {}", path.display());
                return Ok(Self::default());
            }
            Err(e) => {
                return Err(RestorerError::io(
                    format!("reading analyzed metadata {}", path.display()),
                    e,
                ))
            }
        };

        #[derive(Deserialize)]
        struct AnalyzedFile {
            #[serde(default)]
            metadata: LayersMetadata,
        }

        toml::from_str::<AnalyzedFile>(&content)
            .map(|f| f.metadata)
            .map_err(|e| RestorerError::PlatformFile {
                path: path.to_path_buf(),
                reason: e.to_string(),
            })
    }
}
