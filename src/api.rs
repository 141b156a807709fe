//! Platform and buildpack API versions
//!
//! API versions are `<major>.<minor>` strings. They decide which
//! behavioral generation a buildpack or platform belongs to.

use crate::error::{RestorerError, RestorerResult};
use semver::Version;
use std::fmt;
use std::str::FromStr;

/// Buildpack API from which `<layer>.toml` no longer carries layer types
pub const BUILDPACK_CACHE_METADATA_API: ApiVersion = ApiVersion::new(0, 6);

/// Platform APIs newer than this restore layer metadata before data
pub const PLATFORM_LAYER_METADATA_API: ApiVersion = ApiVersion::new(0, 6);

/// A parsed `<major>.<minor>` API version
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ApiVersion(Version);

impl ApiVersion {
    pub const fn new(major: u64, minor: u64) -> Self {
        Self(Version::new(major, minor, 0))
    }

    /// Parse an API version, rejecting anything but `<major>.<minor>`
    pub fn parse(s: &str) -> RestorerResult<Self> {
        let invalid = |reason: String| RestorerError::InvalidApi {
            version: s.to_string(),
            reason,
        };

        let mut parts = s.split('.');
        let (Some(major), Some(minor), None) = (parts.next(), parts.next(), parts.next()) else {
            return Err(invalid("expected <major>.<minor>".to_string()));
        };
        if [major, minor]
            .iter()
            .any(|p| p.is_empty() || !p.chars().all(|c| c.is_ascii_digit()))
        {
            return Err(invalid("components must be non-negative integers".to_string()));
        }

        Version::parse(&format!("{}.{}.0", major, minor))
            .map(Self)
            .map_err(|e| invalid(e.to_string()))
    }

    pub fn major(&self) -> u64 {
        self.0.major
    }

    pub fn minor(&self) -> u64 {
        self.0.minor
    }

    /// Whether this version is at least `other`
    pub fn at_least(&self, other: &ApiVersion) -> bool {
        self >= other
    }
}

impl FromStr for ApiVersion {
    type Err = RestorerError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for ApiVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.0.major, self.0.minor)
    }
}

/// Whether the platform restores launch and cache layer metadata itself.
///
/// Open iff the platform API is strictly newer than
/// [`PLATFORM_LAYER_METADATA_API`].
pub fn restores_layer_metadata(platform_api: &ApiVersion) -> bool {
    *platform_api > PLATFORM_LAYER_METADATA_API
}
