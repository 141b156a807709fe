//! Buildpack group
//!
//! The platform records the buildpacks selected for a build in
//! `group.toml`. Each entry declares the buildpack API it was written
//! against, which drives how its layers are restored.

use crate::api::ApiVersion;
use crate::error::{RestorerError, RestorerResult};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// A buildpack selected for the build
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GroupBuildpack {
    /// Buildpack ID, e.g. `paketo-buildpacks/node-engine`
    pub id: String,

    #[serde(default)]
    pub version: String,

    /// Declared buildpack API
    pub api: String,
}

impl GroupBuildpack {
    pub fn new(id: impl Into<String>, version: impl Into<String>, api: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            version: version.into(),
            api: api.into(),
        }
    }

    /// Directory name used for this buildpack under the layers directory
    pub fn escaped_id(&self) -> String {
        self.id.replace('/', "_")
    }

    /// Parse the declared buildpack API
    pub fn api_version(&self) -> RestorerResult<ApiVersion> {
        ApiVersion::parse(&self.api)
    }
}

#[derive(Debug, Default, Deserialize)]
struct GroupFile {
    #[serde(default)]
    group: Vec<GroupBuildpack>,
}

/// Read the ordered buildpack group from a `group.toml` file
pub async fn read_group(path: &Path) -> RestorerResult<Vec<GroupBuildpack>> {
    let content = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| RestorerError::io(format!("reading group file {}", path.display()), e))?;
    parse_group(&content).map_err(|reason| RestorerError::PlatformFile {
        path: path.to_path_buf(),
        reason,
    })
}

fn parse_group(content: &str) -> Result<Vec<GroupBuildpack>, String> {
    toml::from_str::<GroupFile>(content)
        .map(|f| f.group)
        .map_err(|e| e.to_string())
}
