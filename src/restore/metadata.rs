//! Layer metadata restoration
//!
//! On newer platforms the restorer, rather than the analyzer, writes the
//! `<layer>.toml` and `<layer>.sha` files for layers from the previous
//! build. Launch layers come from the app image; cache-only layers come
//! from the cache. Layer data is restored afterwards.

use crate::buildpack::GroupBuildpack;
use crate::cache::metadata::{CacheMetadata, LayersMetadata};
use crate::error::RestorerResult;
use crate::layer::BuildpackLayer;
use async_trait::async_trait;
use std::collections::BTreeSet;
use std::path::PathBuf;
use tracing::{debug, info};

/// Writes layer metadata files ahead of data restoration
#[async_trait]
pub trait LayerMetadataRestorer: Send + Sync {
    async fn restore(
        &self,
        buildpacks: &[GroupBuildpack],
        layers_metadata: &LayersMetadata,
        cache_metadata: &CacheMetadata,
    ) -> RestorerResult<()>;
}

/// Writes metadata files into the layers directory
#[derive(Debug, Clone)]
pub struct DefaultLayerMetadataRestorer {
    layers_dir: PathBuf,
}

impl DefaultLayerMetadataRestorer {
    pub fn new(layers_dir: impl Into<PathBuf>) -> Self {
        Self {
            layers_dir: layers_dir.into(),
        }
    }

    fn restore_buildpack(
        &self,
        buildpack: &GroupBuildpack,
        layers_metadata: &LayersMetadata,
        cache_metadata: &CacheMetadata,
    ) -> RestorerResult<()> {
        let api = buildpack.api_version()?;
        let buildpack_dir = self.layers_dir.join(buildpack.escaped_id());
        let mut written = BTreeSet::new();

        for (name, layer) in layers_metadata.layers_for(&buildpack.id) {
            let identifier = format!("{}:{}", buildpack.id, name);
            if !layer.launch {
                debug!("Not restoring metadata for {:?}, marked as launch=false", identifier);
                continue;
            }
            if layer.build && !layer.cache {
                debug!(
                    "Not restoring metadata for {:?}, marked as build=true, cache=false",
                    identifier
                );
                continue;
            }
            info!("Restoring metadata for {:?} from app image", identifier);
            BuildpackLayer::new(&buildpack.id, buildpack_dir.join(name)).write_metadata(&api, layer)?;
            written.insert(name.as_str());
        }

        for (name, layer) in cache_metadata.layers_for(&buildpack.id) {
            let identifier = format!("{}:{}", buildpack.id, name);
            if !layer.cache {
                debug!("Not restoring {:?} from cache, marked as cache=false", identifier);
                continue;
            }
            // Launch layers were written from the app image above, or are stale
            if layer.launch || written.contains(name.as_str()) {
                debug!("Not restoring {:?} from cache, marked as launch=true", identifier);
                continue;
            }
            info!("Restoring metadata for {:?} from cache", identifier);
            BuildpackLayer::new(&buildpack.id, buildpack_dir.join(name)).write_metadata(&api, layer)?;
        }

        Ok(())
    }
}

#[async_trait]
impl LayerMetadataRestorer for DefaultLayerMetadataRestorer {
    async fn restore(
        &self,
        buildpacks: &[GroupBuildpack],
        layers_metadata: &LayersMetadata,
        cache_metadata: &CacheMetadata,
    ) -> RestorerResult<()> {
        for buildpack in buildpacks {
            self.restore_buildpack(buildpack, layers_metadata, cache_metadata)?;
        }
        Ok(())
    }
}
