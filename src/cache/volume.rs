//! Volume-backed layer cache
//!
//! A cache volume is a directory holding layer tarballs named by their
//! checksum plus one JSON manifest:
//!
//! ```text
//! <cache>/committed/io.buildpacks.lifecycle.cache.metadata
//! <cache>/committed/sha256:<hex>.tar
//! ```

use crate::cache::metadata::CacheMetadata;
use crate::cache::store::{Cache, LayerStream};
use crate::error::{RestorerError, RestorerResult};
use async_trait::async_trait;
use sha2::{Digest, Sha256};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Manifest file name inside the committed directory
pub const METADATA_FILE: &str = "io.buildpacks.lifecycle.cache.metadata";

const COMMITTED_DIR: &str = "committed";

/// Cache stored in a local directory (usually a mounted volume)
#[derive(Debug, Clone)]
pub struct VolumeCache {
    dir: PathBuf,
    verify_digests: bool,
}

impl VolumeCache {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            verify_digests: false,
        }
    }

    /// Hash `sha256:` blobs before handing them out
    pub fn with_digest_verification(mut self, verify: bool) -> Self {
        self.verify_digests = verify;
        self
    }

    pub fn committed_dir(&self) -> PathBuf {
        self.dir.join(COMMITTED_DIR)
    }

    /// Path of the tarball stored for a checksum
    pub fn layer_path(&self, sha: &str) -> RestorerResult<PathBuf> {
        validate_digest(sha)?;
        Ok(self.committed_dir().join(format!("{}.tar", sha)))
    }
}

/// Reject checksums that would escape the committed directory
fn validate_digest(sha: &str) -> RestorerResult<()> {
    if sha.is_empty()
        || sha.contains('/')
        || sha.contains('\\')
        || sha.contains("..")
        || sha.contains('\0')
    {
        return Err(RestorerError::InvalidLayerDigest(sha.to_string()));
    }
    Ok(())
}

/// Hash a file with SHA-256, returning lowercase hex
fn hash_file(path: &Path) -> RestorerResult<String> {
    let mut file = File::open(path)
        .map_err(|e| RestorerError::io(format!("opening {}", path.display()), e))?;
    let mut hasher = Sha256::new();
    std::io::copy(&mut file, &mut hasher)
        .map_err(|e| RestorerError::io(format!("hashing {}", path.display()), e))?;
    Ok(hex::encode(hasher.finalize()))
}

fn verify_digest(path: &Path, sha: &str) -> RestorerResult<()> {
    let Some(expected) = sha.strip_prefix("sha256:") else {
        debug!("Skipping verification of non-sha256 digest {:?}", sha);
        return Ok(());
    };
    let actual = hash_file(path)?;
    if actual != expected.to_ascii_lowercase() {
        return Err(RestorerError::DigestMismatch {
            expected: sha.to_string(),
            actual: format!("sha256:{}", actual),
        });
    }
    Ok(())
}

#[async_trait]
impl Cache for VolumeCache {
    async fn exists(&self) -> bool {
        tokio::fs::metadata(self.committed_dir()).await.is_ok()
    }

    async fn retrieve_metadata(&self) -> RestorerResult<CacheMetadata> {
        let path = self.committed_dir().join(METADATA_FILE);
        let content = match tokio::fs::read_to_string(&path).await {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                debug!("No cache metadata at {}", path.display());
                return Ok(CacheMetadata::default());
            }
            Err(e) => {
                return Err(RestorerError::io(
                    format!("reading cache metadata {}", path.display()),
                    e,
                ))
            }
        };
        CacheMetadata::from_json(&content)
    }

    async fn retrieve_layer(&self, sha: &str) -> RestorerResult<LayerStream> {
        let path = self.layer_path(sha)?;
        let verify = self.verify_digests;
        let sha = sha.to_string();

        tokio::task::spawn_blocking(move || {
            let file = match File::open(&path) {
                Ok(f) => f,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                    return Err(RestorerError::CacheLayerNotFound(sha));
                }
                Err(e) => {
                    return Err(RestorerError::io(format!("opening {}", path.display()), e))
                }
            };
            if verify {
                verify_digest(&path, &sha)?;
            }
            Ok(Box::new(file) as LayerStream)
        })
        .await
        .map_err(|e| RestorerError::TaskJoin(e.to_string()))?
    }

    fn name(&self) -> String {
        self.dir.display().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::store::testing::tar_with;
    use std::io::Read;
    use tempfile::TempDir;

    fn write_blob(cache: &VolumeCache, sha: &str, bytes: &[u8]) {
        std::fs::create_dir_all(cache.committed_dir()).unwrap();
        std::fs::write(cache.layer_path(sha).unwrap(), bytes).unwrap();
    }

    fn digest_of(bytes: &[u8]) -> String {
        format!("sha256:{}", hex::encode(Sha256::digest(bytes)))
    }

    #[tokio::test]
    async fn missing_directory_is_empty_cache() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path().join("cache"));

        assert!(!cache.exists().await);
        assert!(cache.retrieve_metadata().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn reads_metadata_file() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path());
        std::fs::create_dir_all(cache.committed_dir()).unwrap();
        std::fs::write(
            cache.committed_dir().join(METADATA_FILE),
            r#"{"buildpacks":[{"key":"acme/go","layers":{"gocache":{"sha":"sha256:1","cache":true}}}]}"#,
        )
        .unwrap();

        assert!(cache.exists().await);
        let meta = cache.retrieve_metadata().await.unwrap();
        assert!(meta.layers_for("acme/go")["gocache"].cache);
    }

    #[tokio::test]
    async fn malformed_metadata_errors() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path());
        std::fs::create_dir_all(cache.committed_dir()).unwrap();
        std::fs::write(cache.committed_dir().join(METADATA_FILE), "not json").unwrap();

        assert!(cache.retrieve_metadata().await.is_err());
    }

    #[tokio::test]
    async fn retrieves_layer_by_sha() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path());
        let tar = tar_with(&[("layers/acme_go/gocache/a.txt", "hello")]);
        write_blob(&cache, "sha256:abc", &tar);

        let mut stream = cache.retrieve_layer("sha256:abc").await.unwrap();
        let mut read = Vec::new();
        stream.read_to_end(&mut read).unwrap();
        assert_eq!(read, tar);
    }

    #[tokio::test]
    async fn missing_layer_is_not_found() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path());

        let err = cache.retrieve_layer("sha256:nope").await.err().unwrap();
        assert!(matches!(err, RestorerError::CacheLayerNotFound(ref s) if s == "sha256:nope"));
    }

    #[tokio::test]
    async fn rejects_traversal_digest() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path());

        for bad in ["../../etc/passwd", "a/b", "", "..", "a\\b"] {
            let err = cache.retrieve_layer(bad).await.err().unwrap();
            assert!(matches!(err, RestorerError::InvalidLayerDigest(_)), "{bad:?}");
        }
    }

    #[tokio::test]
    async fn verification_accepts_matching_digest() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path()).with_digest_verification(true);
        let tar = tar_with(&[("a.txt", "content")]);
        let sha = digest_of(&tar);
        write_blob(&cache, &sha, &tar);

        assert!(cache.retrieve_layer(&sha).await.is_ok());
    }

    #[tokio::test]
    async fn verification_rejects_tampered_blob() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path()).with_digest_verification(true);
        let tar = tar_with(&[("a.txt", "content")]);
        let sha = digest_of(&tar);
        write_blob(&cache, &sha, b"tampered");

        let err = cache.retrieve_layer(&sha).await.err().unwrap();
        assert!(matches!(err, RestorerError::DigestMismatch { .. }));
    }

    #[tokio::test]
    async fn verification_off_by_default() {
        let temp = TempDir::new().unwrap();
        let cache = VolumeCache::new(temp.path());
        let sha = digest_of(b"original");
        write_blob(&cache, &sha, b"tampered");

        assert!(cache.retrieve_layer(&sha).await.is_ok());
    }
}
