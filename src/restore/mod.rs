//! Layer restoration
//!
//! Reconciles the layer records left on disk with what the cache can
//! actually provide:
//!
//! 1. Resolve the cache manifest once
//! 2. On newer platforms, write layer metadata from the app image and cache
//! 3. Per buildpack, in group order, pick the cache candidates and remove
//!    every candidate the cache cannot back with the same checksum
//! 4. Fetch and extract the remaining candidates concurrently
//! 5. Wait for every fetch, then report the first failure if any

pub mod group;
pub mod metadata;
pub mod policy;
pub mod reconcile;

pub use group::RestoreGroup;
pub use metadata::{DefaultLayerMetadataRestorer, LayerMetadataRestorer};
pub use policy::CachedLayerPolicy;
pub use reconcile::{reconcile_layer, Decision, RestoreOutcome};

use crate::api::{restores_layer_metadata, ApiVersion};
use crate::buildpack::GroupBuildpack;
use crate::cache::{retrieve_cache_metadata, Cache, CacheMetadata, LayersMetadata};
use crate::error::{RestorerError, RestorerResult, Stage};
use crate::layer::{extract, read_buildpack_layers_dir};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Outcome for every layer record seen during a successful restore
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RestoreSummary {
    /// `(identifier, outcome)` in processing order
    pub layers: Vec<(String, RestoreOutcome)>,
}

impl RestoreSummary {
    pub fn count(&self, outcome: RestoreOutcome) -> usize {
        self.layers.iter().filter(|(_, o)| *o == outcome).count()
    }

    /// Outcome recorded for a layer identifier
    pub fn outcome_of(&self, identifier: &str) -> Option<RestoreOutcome> {
        self.layers
            .iter()
            .find(|(id, _)| id == identifier)
            .map(|(_, o)| *o)
    }

    fn record(&mut self, identifier: String, outcome: RestoreOutcome) {
        self.layers.push((identifier, outcome));
    }
}

/// Restores buildpack layers from a cache
pub struct Restorer {
    layers_dir: PathBuf,
    extract_root: PathBuf,
    buildpacks: Vec<GroupBuildpack>,
    apis: Vec<ApiVersion>,
    platform_api: ApiVersion,
    layers_metadata: LayersMetadata,
    metadata_restorer: Arc<dyn LayerMetadataRestorer>,
}

impl Restorer {
    /// Create a restorer for a buildpack group.
    ///
    /// Fails if the platform API or any buildpack API is malformed.
    pub fn new(
        layers_dir: impl Into<PathBuf>,
        buildpacks: Vec<GroupBuildpack>,
        platform_api: &str,
    ) -> RestorerResult<Self> {
        let layers_dir = layers_dir.into();
        let platform_api = ApiVersion::parse(platform_api)?;
        let apis = buildpacks
            .iter()
            .map(GroupBuildpack::api_version)
            .collect::<RestorerResult<Vec<_>>>()?;

        Ok(Self {
            metadata_restorer: Arc::new(DefaultLayerMetadataRestorer::new(&layers_dir)),
            layers_dir,
            extract_root: PathBuf::from("/"),
            buildpacks,
            apis,
            platform_api,
            layers_metadata: LayersMetadata::default(),
        })
    }

    /// Directory layer tarballs are unpacked beneath (default `/`)
    pub fn with_extract_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.extract_root = root.into();
        self
    }

    /// App image layer metadata from the previous build
    pub fn with_layers_metadata(mut self, layers_metadata: LayersMetadata) -> Self {
        self.layers_metadata = layers_metadata;
        self
    }

    pub fn with_metadata_restorer(mut self, restorer: Arc<dyn LayerMetadataRestorer>) -> Self {
        self.metadata_restorer = restorer;
        self
    }

    pub fn layers_dir(&self) -> &Path {
        &self.layers_dir
    }

    /// Whether this platform has layer metadata restored before data
    pub fn restores_layer_metadata(&self) -> bool {
        restores_layer_metadata(&self.platform_api)
    }

    /// Restore metadata for launch and cache layers into the layers
    /// directory, then restore data for cache layers, removing those that
    /// cannot be restored.
    ///
    /// Without a usable cache no cached layer metadata is restored and
    /// every candidate is removed.
    pub async fn restore(&self, cache: Option<Arc<dyn Cache>>) -> RestorerResult<RestoreSummary> {
        let cache_metadata = retrieve_cache_metadata(cache.as_deref()).await?;

        if self.restores_layer_metadata() {
            self.metadata_restorer
                .restore(&self.buildpacks, &self.layers_metadata, &cache_metadata)
                .await?;
        }

        let mut group = RestoreGroup::new();
        let mut summary = RestoreSummary::default();
        if let Err(e) = self.reconcile(&cache_metadata, cache.as_ref(), &mut group, &mut summary) {
            // Restorations already running still finish before we report
            group.drain().await;
            return Err(e);
        }

        debug!("Waiting for {} layer restoration(s)", group.len());
        group.wait().await?;
        Ok(summary)
    }

    fn reconcile(
        &self,
        cache_metadata: &CacheMetadata,
        cache: Option<&Arc<dyn Cache>>,
        group: &mut RestoreGroup,
        summary: &mut RestoreSummary,
    ) -> RestorerResult<()> {
        for (buildpack, api) in self.buildpacks.iter().zip(&self.apis) {
            let cached_layers = cache_metadata.layers_for(&buildpack.id);
            let policy = CachedLayerPolicy::for_api(api);
            debug!("Selecting cached layers of {} by {:?}", buildpack.id, policy);

            let dir = read_buildpack_layers_dir(&self.layers_dir, buildpack)
                .map_err(|e| RestorerError::layers_dir(&buildpack.id, e))?;
            let candidates = dir.find_layers(policy.predicate(cached_layers));

            for layer in dir.layers().iter().filter(|l| !candidates.contains(l)) {
                summary.record(layer.identifier(), RestoreOutcome::Skipped);
            }

            for layer in candidates {
                let decision = reconcile_layer(&layer, cached_layers)?;
                summary.record(layer.identifier(), decision.outcome());

                if let Decision::Restore { sha } = decision {
                    let cache = cache.cloned();
                    let root = self.extract_root.clone();
                    let buildpack_id = buildpack.id.clone();
                    let name = layer.name();
                    group.spawn(async move {
                        restore_layer(cache, sha, root).await.map_err(|e| {
                            RestorerError::layer(Stage::RestoringData, buildpack_id, name, e)
                        })
                    });
                }
            }
        }
        Ok(())
    }
}

/// Fetch one layer tarball and unpack it
async fn restore_layer(
    cache: Option<Arc<dyn Cache>>,
    sha: String,
    root: PathBuf,
) -> RestorerResult<()> {
    // Unreachable without a manifest entry, but never dereference a missing cache
    let cache = cache.ok_or(RestorerError::CacheNotProvided)?;

    debug!("Retrieving data for {:?}", sha);
    let stream = cache.retrieve_layer(&sha).await?;

    tokio::task::spawn_blocking(move || extract(stream, &root).map(|_| ()))
        .await
        .map_err(|e| RestorerError::TaskJoin(e.to_string()))?
}
