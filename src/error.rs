//! Error types for the restorer
//!
//! All modules use `RestorerResult<T>` as their return type.

use std::fmt;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for restorer operations
pub type RestorerResult<T> = Result<T, RestorerError>;

/// Phase of per-layer work an error was raised in
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    /// Scanning a buildpack's layers directory
    ReadingLayersDir,
    /// Reading a layer's on-disk metadata or checksum
    ReadingLayer,
    /// Deleting a stale layer record
    RemovingLayer,
    /// Fetching and extracting layer content from the cache
    RestoringData,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::ReadingLayersDir => "reading buildpack layer directory",
            Self::ReadingLayer => "reading layer",
            Self::RemovingLayer => "removing layer",
            Self::RestoringData => "restoring data",
        };
        f.write_str(s)
    }
}

/// All errors that can occur while restoring layers
#[derive(Error, Debug)]
pub enum RestorerError {
    // Configuration errors
    #[error("Invalid API version {version:?}: {reason}")]
    InvalidApi { version: String, reason: String },

    #[error("Invalid configuration at {path}: {reason}")]
    ConfigInvalid { path: PathBuf, reason: String },

    #[error("Failed to create config directory {path}: {source}")]
    ConfigDirCreate {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Restoring layer: cache not provided")]
    CacheNotProvided,

    // Platform file errors
    #[error("Failed to parse {path}: {reason}")]
    PlatformFile { path: PathBuf, reason: String },

    // Cache errors
    #[error("Retrieving cache metadata: {0}")]
    CacheMetadata(#[source] Box<RestorerError>),

    #[error("Layer {0:?} not found in cache")]
    CacheLayerNotFound(String),

    #[error("Invalid layer digest {0:?}")]
    InvalidLayerDigest(String),

    #[error("Digest mismatch for cached layer: expected {expected}, found {actual}")]
    DigestMismatch { expected: String, actual: String },

    // Layer errors
    #[error("Failed to parse layer metadata {path}: {reason}")]
    LayerMetadata { path: PathBuf, reason: String },

    #[error("Archive entry escapes extraction root: {0}")]
    UnsafeArchivePath(String),

    /// Layer work failure; `layer` is unset for buildpack-wide stages
    #[error("{stage} {}: {source}", qualified_name(.buildpack, .layer))]
    Layer {
        stage: Stage,
        buildpack: String,
        layer: Option<String>,
        #[source]
        source: Box<RestorerError>,
    },

    #[error("Restoring data: {source}")]
    RestoringData {
        #[source]
        source: Box<RestorerError>,
        /// Failures joined after the reported one
        other_failures: usize,
    },

    #[error("Restore task failed to complete: {0}")]
    TaskJoin(String),

    // IO errors
    #[error("IO error: {context}")]
    Io {
        context: String,
        #[source]
        source: std::io::Error,
    },

    // Serialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),
}

fn qualified_name(buildpack: &str, layer: &Option<String>) -> String {
    match layer {
        Some(layer) => format!("{}:{}", buildpack, layer),
        None => buildpack.to_string(),
    }
}

impl RestorerError {
    /// Create an IO error with context
    pub fn io(context: impl Into<String>, source: std::io::Error) -> Self {
        Self::Io {
            context: context.into(),
            source,
        }
    }

    /// Attach layer identity to an error raised while handling one layer
    pub fn layer(
        stage: Stage,
        buildpack: impl Into<String>,
        layer: impl Into<String>,
        source: RestorerError,
    ) -> Self {
        Self::Layer {
            stage,
            buildpack: buildpack.into(),
            layer: Some(layer.into()),
            source: Box::new(source),
        }
    }

    /// Attach buildpack identity to a failure reading its layers directory
    pub fn layers_dir(buildpack: impl Into<String>, source: RestorerError) -> Self {
        Self::Layer {
            stage: Stage::ReadingLayersDir,
            buildpack: buildpack.into(),
            layer: None,
            source: Box::new(source),
        }
    }

    /// Stage of layer work this error came from, looking through wrappers
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Layer { stage, .. } => Some(*stage),
            Self::RestoringData { source, .. } => source.stage().or(Some(Stage::RestoringData)),
            _ => None,
        }
    }

    /// Buildpack the failing layer belongs to
    pub fn buildpack(&self) -> Option<&str> {
        match self {
            Self::Layer { buildpack, .. } => Some(buildpack),
            Self::RestoringData { source, .. } => source.buildpack(),
            _ => None,
        }
    }

    /// Name of the failing layer
    pub fn layer_name(&self) -> Option<&str> {
        match self {
            Self::Layer { layer, .. } => layer.as_deref(),
            Self::RestoringData { source, .. } => source.layer_name(),
            _ => None,
        }
    }

    /// Get actionable hint for the error
    pub fn hint(&self) -> Option<&'static str> {
        match self {
            Self::InvalidApi { .. } => Some("API versions must look like <major>.<minor>, e.g. 0.7"),
            Self::CacheNotProvided => Some("Pass --cache-dir or set CNB_CACHE_DIR"),
            Self::DigestMismatch { .. } => {
                Some("The cache volume is corrupt; clear it and rebuild")
            }
            Self::RestoringData { .. } => Some("Re-run with -vv to see every failing layer"),
            _ => None,
        }
    }
}
