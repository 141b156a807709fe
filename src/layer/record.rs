//! On-disk layer records
//!
//! A buildpack layer lives under `<layers>/<buildpack>/` as up to three
//! entries sharing one name:
//!
//! - `<name>.toml` with the layer types and buildpack metadata
//! - `<name>.sha` with the checksum of the layer when it was last exported
//! - `<name>/` with the layer contents

use crate::api::{ApiVersion, BUILDPACK_CACHE_METADATA_API};
use crate::cache::metadata::LayerMetadata;
use crate::error::{RestorerError, RestorerResult};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};

/// Layer types as written by buildpack API 0.6 and newer
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayerTypes {
    #[serde(default)]
    pub launch: bool,
    #[serde(default)]
    pub build: bool,
    #[serde(default)]
    pub cache: bool,
}

/// `<name>.toml` as found on disk; accepts both generations of the format
#[derive(Debug, Default, Deserialize)]
struct LayerFile {
    #[serde(default)]
    types: Option<LayerTypes>,

    // Top-level flags written for buildpack API < 0.6
    #[serde(default)]
    launch: bool,
    #[serde(default)]
    build: bool,
    #[serde(default)]
    cache: bool,

    #[serde(default)]
    metadata: Option<toml::Table>,
}

impl LayerFile {
    fn types(&self) -> LayerTypes {
        self.types.unwrap_or(LayerTypes {
            launch: self.launch,
            build: self.build,
            cache: self.cache,
        })
    }
}

#[derive(Serialize)]
struct TypedLayerFile<'a> {
    types: LayerTypes,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a toml::Table>,
}

#[derive(Serialize)]
struct LegacyLayerFile<'a> {
    launch: bool,
    build: bool,
    cache: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    metadata: Option<&'a toml::Table>,
}

/// Parsed contents of a layer record
#[derive(Debug, Clone, Default, PartialEq)]
pub struct LayerData {
    /// Checksum recorded in `<name>.sha`; empty when there is none
    pub sha: String,
    pub types: LayerTypes,
    pub metadata: Option<toml::Table>,
}

/// A layer record belonging to one buildpack
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildpackLayer {
    buildpack_id: String,
    path: PathBuf,
}

impl BuildpackLayer {
    pub fn new(buildpack_id: impl Into<String>, path: impl Into<PathBuf>) -> Self {
        Self {
            buildpack_id: buildpack_id.into(),
            path: path.into(),
        }
    }

    /// Layer name, the final segment of its path
    pub fn name(&self) -> String {
        self.path
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default()
    }

    /// `<buildpack id>:<layer name>`, for diagnostics
    pub fn identifier(&self) -> String {
        format!("{}:{}", self.buildpack_id, self.name())
    }

    pub fn buildpack_id(&self) -> &str {
        &self.buildpack_id
    }

    /// Path of the layer contents directory
    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn toml_path(&self) -> PathBuf {
        self.sibling("toml")
    }

    pub fn sha_path(&self) -> PathBuf {
        self.sibling("sha")
    }

    fn sibling(&self, ext: &str) -> PathBuf {
        let mut name = self.path.as_os_str().to_owned();
        name.push(".");
        name.push(ext);
        PathBuf::from(name)
    }

    /// Read the layer metadata and recorded checksum.
    ///
    /// Missing files read as defaults, so a record without a `.sha` file
    /// has an empty checksum.
    pub fn read(&self) -> RestorerResult<LayerData> {
        let toml_path = self.toml_path();
        let file = match fs::read_to_string(&toml_path) {
            Ok(content) => {
                toml::from_str::<LayerFile>(&content).map_err(|e| RestorerError::LayerMetadata {
                    path: toml_path.clone(),
                    reason: e.to_string(),
                })?
            }
            Err(e) if e.kind() == ErrorKind::NotFound => LayerFile::default(),
            Err(e) => {
                return Err(RestorerError::io(
                    format!("reading {}", toml_path.display()),
                    e,
                ))
            }
        };

        let sha_path = self.sha_path();
        let sha = match fs::read_to_string(&sha_path) {
            Ok(sha) => sha.trim().to_string(),
            Err(e) if e.kind() == ErrorKind::NotFound => String::new(),
            Err(e) => {
                return Err(RestorerError::io(
                    format!("reading {}", sha_path.display()),
                    e,
                ))
            }
        };

        Ok(LayerData {
            sha,
            types: file.types(),
            metadata: file.metadata,
        })
    }

    /// Whether the record's own `<name>.toml` marks it `cache = true`.
    ///
    /// Unreadable records are not cached.
    pub fn is_cached_on_disk(&self) -> bool {
        fs::read_to_string(self.toml_path())
            .ok()
            .and_then(|content| toml::from_str::<LayerFile>(&content).ok())
            .map(|file| file.types().cache)
            .unwrap_or(false)
    }

    /// Delete the record: contents directory, `.toml` and `.sha` files
    pub fn remove(&self) -> RestorerResult<()> {
        match fs::remove_dir_all(&self.path) {
            Ok(()) => {}
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => {
                return Err(RestorerError::io(
                    format!("removing {}", self.path.display()),
                    e,
                ))
            }
        }
        for file in [self.toml_path(), self.sha_path()] {
            match fs::remove_file(&file) {
                Ok(()) => {}
                Err(e) if e.kind() == ErrorKind::NotFound => {}
                Err(e) => {
                    return Err(RestorerError::io(format!("removing {}", file.display()), e))
                }
            }
        }
        Ok(())
    }

    /// Write `<name>.toml` and `<name>.sha` from recorded metadata, in the
    /// format of the given buildpack API
    pub fn write_metadata(&self, buildpack_api: &ApiVersion, meta: &LayerMetadata) -> RestorerResult<()> {
        let metadata = match &meta.data {
            Some(data) => match toml::Value::try_from(data)? {
                toml::Value::Table(table) => Some(table),
                _ => None,
            },
            None => None,
        };

        let types = LayerTypes {
            launch: meta.launch,
            build: meta.build,
            cache: meta.cache,
        };
        let content = if buildpack_api.at_least(&BUILDPACK_CACHE_METADATA_API) {
            toml::to_string(&TypedLayerFile {
                types,
                metadata: metadata.as_ref(),
            })?
        } else {
            toml::to_string(&LegacyLayerFile {
                launch: types.launch,
                build: types.build,
                cache: types.cache,
                metadata: metadata.as_ref(),
            })?
        };

        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| RestorerError::io(format!("creating {}", parent.display()), e))?;
        }
        let toml_path = self.toml_path();
        fs::write(&toml_path, content)
            .map_err(|e| RestorerError::io(format!("writing {}", toml_path.display()), e))?;
        let sha_path = self.sha_path();
        fs::write(&sha_path, &meta.sha)
            .map_err(|e| RestorerError::io(format!("writing {}", sha_path.display()), e))?;
        Ok(())
    }
}
