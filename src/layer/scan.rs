//! Buildpack layers directory scanning

use crate::buildpack::GroupBuildpack;
use crate::error::{RestorerError, RestorerResult};
use crate::layer::record::BuildpackLayer;
use std::collections::BTreeSet;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Buildpack-level names that are never layers, as files or directories
const NON_LAYER_NAMES: &[&str] = &["launch", "build", "store"];

/// Layer records found under one buildpack's directory
#[derive(Debug)]
pub struct BuildpackLayersDir {
    path: PathBuf,
    layers: Vec<BuildpackLayer>,
}

impl BuildpackLayersDir {
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Number of layer records on disk
    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }

    pub fn layers(&self) -> &[BuildpackLayer] {
        &self.layers
    }

    /// Records accepted by the predicate, in name order
    pub fn find_layers<F>(&self, predicate: F) -> Vec<BuildpackLayer>
    where
        F: Fn(&BuildpackLayer) -> bool,
    {
        self.layers.iter().filter(|l| predicate(l)).cloned().collect()
    }
}

/// Enumerate the layer records of a buildpack.
///
/// A layer is any subdirectory or any `<name>.toml` file, except for the
/// buildpack-level `launch`, `build` and `store` names. A buildpack
/// without a directory has no layers.
pub fn read_buildpack_layers_dir(
    layers_dir: &Path,
    buildpack: &GroupBuildpack,
) -> RestorerResult<BuildpackLayersDir> {
    let path = layers_dir.join(buildpack.escaped_id());

    let entries = match std::fs::read_dir(&path) {
        Ok(entries) => entries,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No layers directory for {}", buildpack.id);
            return Ok(BuildpackLayersDir {
                path,
                layers: Vec::new(),
            });
        }
        Err(e) => {
            return Err(RestorerError::io(
                format!("reading {}", path.display()),
                e,
            ))
        }
    };

    let mut names = BTreeSet::new();
    for entry in entries {
        let entry =
            entry.map_err(|e| RestorerError::io(format!("reading {}", path.display()), e))?;
        let file_name = entry.file_name().to_string_lossy().into_owned();
        let file_type = entry
            .file_type()
            .map_err(|e| RestorerError::io(format!("inspecting {}", file_name), e))?;

        let name = if file_type.is_dir() {
            Some(file_name.as_str())
        } else {
            file_name.strip_suffix(".toml")
        };
        if let Some(name) = name.filter(|n| !NON_LAYER_NAMES.contains(n)) {
            names.insert(name.to_string());
        }
    }

    let layers = names
        .into_iter()
        .map(|name| BuildpackLayer::new(&buildpack.id, path.join(name)))
        .collect::<Vec<_>>();
    debug!("Found {} layer(s) for {}", layers.len(), buildpack.id);

    Ok(BuildpackLayersDir { path, layers })
}
