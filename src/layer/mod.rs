//! Buildpack layers on disk
//!
//! Each buildpack owns a directory under the layers root holding its
//! layer records. This module scans those directories, reads and removes
//! individual records, and unpacks cached layer tarballs.

pub mod extract;
pub mod record;
pub mod scan;

pub use extract::extract;
pub use record::{BuildpackLayer, LayerData, LayerTypes};
pub use scan::{read_buildpack_layers_dir, BuildpackLayersDir};
