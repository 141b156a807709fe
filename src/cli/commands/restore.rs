//! Restore command - reconcile and restore cached layers

use crate::buildpack::read_group;
use crate::cache::{Cache, LayersMetadata, VolumeCache};
use crate::cli::args::RestoreArgs;
use crate::config::Config;
use crate::error::RestorerResult;
use crate::restore::{RestoreOutcome, Restorer};
use std::sync::Arc;
use tracing::{debug, info};

/// Execute the restore command
pub async fn execute(args: RestoreArgs, config: &Config) -> RestorerResult<()> {
    let config = apply_overrides(args, config);
    let paths = &config.paths;

    let group_path = paths.group_path();
    debug!("Reading buildpack group from {}", group_path.display());
    let buildpacks = read_group(&group_path).await?;

    let analyzed_path = paths.analyzed_path();
    debug!("Reading layers metadata from {}", analyzed_path.display());
    let layers_metadata = LayersMetadata::from_analyzed_file(&analyzed_path).await?;

    let cache: Option<Arc<dyn Cache>> = paths.cache_dir.as_ref().map(|dir| {
        Arc::new(VolumeCache::new(dir).with_digest_verification(config.restore.verify_digests))
            as Arc<dyn Cache>
    });
    if let Some(cache) = &cache {
        info!("Using cache volume {}", cache.name());
    }

    let restorer = Restorer::new(&paths.layers_dir, buildpacks, &config.platform.api)?
        .with_extract_root(&config.restore.extract_root)
        .with_layers_metadata(layers_metadata);

    let summary = restorer.restore(cache).await?;

    println!(
        "Restored {}, removed {}, skipped {}",
        summary.count(RestoreOutcome::Restored),
        summary.count(RestoreOutcome::Removed),
        summary.count(RestoreOutcome::Skipped),
    );

    Ok(())
}

/// Layer command-line flags over the loaded configuration
fn apply_overrides(args: RestoreArgs, config: &Config) -> Config {
    let mut config = config.clone();

    if let Some(layers_dir) = args.layers_dir {
        config.paths.layers_dir = layers_dir;
    }
    if args.group_path.is_some() {
        config.paths.group_path = args.group_path;
    }
    if args.analyzed_path.is_some() {
        config.paths.analyzed_path = args.analyzed_path;
    }
    if args.cache_dir.is_some() {
        config.paths.cache_dir = args.cache_dir;
    }
    if let Some(api) = args.platform_api {
        config.platform.api = api;
    }
    if let Some(root) = args.extract_root {
        config.restore.extract_root = root;
    }
    if args.verify_digests {
        config.restore.verify_digests = true;
    }

    config
}
