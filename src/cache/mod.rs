//! Layer cache access
//!
//! Caches are content-addressed: layer tarballs are stored under their
//! checksum and described by a manifest recording, per buildpack, which
//! layers were cached and with which checksum.
//!
//! The restorer never writes to a cache.

pub mod metadata;
pub mod store;
pub mod volume;

pub use metadata::{BuildpackLayersMetadata, CacheMetadata, LayerMetadata, LayersMetadata};
pub use store::{retrieve_cache_metadata, Cache, LayerStream};
pub use volume::VolumeCache;
