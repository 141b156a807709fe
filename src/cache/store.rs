//! Cache store abstraction
//!
//! The restorer only reads from the cache: it asks for the manifest once
//! and then for layer tarballs by checksum, possibly from many tasks at once.

use crate::cache::metadata::CacheMetadata;
use crate::error::{RestorerError, RestorerResult};
use async_trait::async_trait;
use std::io::Read;
use tracing::{debug, info};

/// Layer tarball handed out by a cache. Dropping it releases the handle.
pub type LayerStream = Box<dyn Read + Send>;

/// Content-addressed store of previously built layers
///
/// Implementations must tolerate concurrent `retrieve_layer` calls.
#[async_trait]
pub trait Cache: Send + Sync {
    /// Whether the backing store has ever been written
    async fn exists(&self) -> bool;

    /// Read the manifest of cached layers
    async fn retrieve_metadata(&self) -> RestorerResult<CacheMetadata>;

    /// Open the tarball stored under a layer checksum
    async fn retrieve_layer(&self, sha: &str) -> RestorerResult<LayerStream>;

    /// Human-readable name for logs
    fn name(&self) -> String;
}

/// Resolve the cache manifest.
///
/// Without a usable cache the manifest is empty, so no cached layer
/// metadata or data will be restored.
pub async fn retrieve_cache_metadata(cache: Option<&dyn Cache>) -> RestorerResult<CacheMetadata> {
    let Some(cache) = cache else {
        debug!("Usable cache not provided, using empty cache metadata");
        return Ok(CacheMetadata::default());
    };

    if !cache.exists().await {
        info!("Layers cache not found");
    }
    debug!("Retrieving cache metadata from {}", cache.name());

    cache
        .retrieve_metadata()
        .await
        .map_err(|e| RestorerError::CacheMetadata(Box::new(e)))
}
