//! Which on-disk layers are cache candidates
//!
//! | Buildpack API | Source of truth for `cache = true`        |
//! |---------------|-------------------------------------------|
//! | >= 0.6        | cache metadata (`<layer>.toml` has no types) |
//! | <  0.6        | the layer's own `<layer>.toml`            |
//!
//! Older buildpacks keep using the on-disk flag because the files may have
//! been written by tooling that never cross-referenced the cache. Layers it
//! selects that the cache no longer holds are cleaned up by reconciliation.

use crate::api::{ApiVersion, BUILDPACK_CACHE_METADATA_API};
use crate::cache::metadata::LayerMetadata;
use crate::layer::BuildpackLayer;
use std::collections::BTreeMap;

/// How cache candidates are selected for one buildpack
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CachedLayerPolicy {
    /// Candidate iff the cache metadata lists the layer with `cache = true`
    CacheMetadata,
    /// Candidate iff the layer's `<layer>.toml` says `cache = true`
    LayerToml,
}

/// Minimum buildpack API for each policy, newest first. First match wins;
/// APIs older than every entry read the flag from `<layer>.toml`.
const POLICY_TABLE: &[(ApiVersion, CachedLayerPolicy)] =
    &[(BUILDPACK_CACHE_METADATA_API, CachedLayerPolicy::CacheMetadata)];

impl CachedLayerPolicy {
    /// Policy for a buildpack declaring `api`
    pub fn for_api(api: &ApiVersion) -> Self {
        POLICY_TABLE
            .iter()
            .find(|(min, _)| api.at_least(min))
            .map(|(_, policy)| *policy)
            .unwrap_or(Self::LayerToml)
    }

    pub fn is_candidate(
        &self,
        layer: &BuildpackLayer,
        cached_layers: &BTreeMap<String, LayerMetadata>,
    ) -> bool {
        match self {
            Self::CacheMetadata => cached_layers
                .get(&layer.name())
                .is_some_and(|cached| cached.cache),
            Self::LayerToml => layer.is_cached_on_disk(),
        }
    }

    /// Candidate predicate bound to one buildpack's cache metadata
    pub fn predicate<'a>(
        self,
        cached_layers: &'a BTreeMap<String, LayerMetadata>,
    ) -> impl Fn(&BuildpackLayer) -> bool + 'a {
        move |layer| self.is_candidate(layer, cached_layers)
    }
}
