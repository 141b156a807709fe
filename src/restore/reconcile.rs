//! Per-layer reconciliation against the cache manifest
//!
//! Every candidate ends up either removed or scheduled for restoration.
//! Anything uncertain resolves to removal.

use crate::cache::metadata::LayerMetadata;
use crate::error::{RestorerError, RestorerResult, Stage};
use crate::layer::BuildpackLayer;
use std::collections::BTreeMap;
use std::fmt;
use tracing::{debug, info};

/// What happened to an on-disk layer record
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestoreOutcome {
    /// Record deleted
    Removed,
    /// Data restored from the cache
    Restored,
    /// Not a cache candidate; left as is
    Skipped,
}

impl fmt::Display for RestoreOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Removed => write!(f, "removed"),
            Self::Restored => write!(f, "restored"),
            Self::Skipped => write!(f, "skipped"),
        }
    }
}

/// Decision taken for one candidate
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The cache has no entry for the layer; record removed
    RemovedNotInCache,
    /// Checksums differ; record removed
    RemovedWrongSha { layer_sha: String, cache_sha: String },
    /// Checksums match; data should be fetched under `sha`
    Restore { sha: String },
}

impl Decision {
    pub fn outcome(&self) -> RestoreOutcome {
        match self {
            Self::RemovedNotInCache | Self::RemovedWrongSha { .. } => RestoreOutcome::Removed,
            Self::Restore { .. } => RestoreOutcome::Restored,
        }
    }
}

/// Reconcile one candidate with its buildpack's cached layers.
///
/// Stale records are removed here. Read and removal failures are fatal.
pub fn reconcile_layer(
    layer: &BuildpackLayer,
    cached_layers: &BTreeMap<String, LayerMetadata>,
) -> RestorerResult<Decision> {
    let Some(cached) = cached_layers.get(&layer.name()) else {
        info!("Removing {:?}, not in cache", layer.identifier());
        remove(layer)?;
        return Ok(Decision::RemovedNotInCache);
    };

    let data = layer
        .read()
        .map_err(|e| RestorerError::layer(Stage::ReadingLayer, layer.buildpack_id(), layer.name(), e))?;

    if data.sha != cached.sha {
        info!("Removing {:?}, wrong sha", layer.identifier());
        debug!("Layer sha: {:?}, cache sha: {:?}", data.sha, cached.sha);
        remove(layer)?;
        return Ok(Decision::RemovedWrongSha {
            layer_sha: data.sha,
            cache_sha: cached.sha.clone(),
        });
    }

    info!("Restoring data for {:?} from cache", layer.identifier());
    Ok(Decision::Restore {
        sha: cached.sha.clone(),
    })
}

fn remove(layer: &BuildpackLayer) -> RestorerResult<()> {
    layer
        .remove()
        .map_err(|e| RestorerError::layer(Stage::RemovingLayer, layer.buildpack_id(), layer.name(), e))
}
