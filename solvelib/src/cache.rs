//! Content-addressed cache of compiled models.
//!
//! Translating a model into its solver-ready form is the expensive,
//! deterministic step. Entries are keyed by the digest of the trimmed model
//! text, so resubmitting the same model with different data, solver or
//! options skips the translation entirely.

use crate::types::CacheKey;
use sha2::{Digest, Sha256};
use std::io;
use std::path::{Path, PathBuf};
use tokio::fs;
use uuid::Uuid;

/// Artifact paths for one compiled model: the model text itself, its
/// translated form and the translator's checksum file.
#[derive(Clone, Debug)]
pub struct CachedModel {
    pub essence: PathBuf,
    pub eprime: PathBuf,
    pub checksum: PathBuf,
}

#[derive(Clone, Debug)]
pub struct ModelCache {
    root: PathBuf,
}

impl ModelCache {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Cache key of a model: hex SHA-256 of the trimmed text. Models that
    /// differ only in leading/trailing whitespace share a key.
    pub fn key(model: &str) -> CacheKey {
        format!("{:x}", Sha256::digest(model.trim().as_bytes()))
    }

    fn entry(&self, key: &str) -> CachedModel {
        CachedModel {
            essence: self.root.join(format!("{key}.essence")),
            eprime: self.root.join(format!("{key}.eprime")),
            checksum: self.root.join(format!("{key}.conjure-checksum")),
        }
    }

    /// Look up previously compiled artifacts. Pure read; a partially written
    /// entry counts as a miss.
    pub async fn lookup(&self, key: &str) -> Option<CachedModel> {
        let entry = self.entry(key);
        for path in [&entry.essence, &entry.eprime, &entry.checksum] {
            if !fs::try_exists(path).await.unwrap_or(false) {
                return None;
            }
        }
        Some(entry)
    }

    /// Populate the entry for `key` from a finished job's artifacts.
    ///
    /// Each file is copied to a temporary name and renamed into place, so a
    /// concurrent reader sees the old entry or the new one, never a torn
    /// file. Storing the same key twice overwrites it with identical content.
    pub async fn store(&self, key: &str, artifacts: &CachedModel) -> io::Result<()> {
        fs::create_dir_all(&self.root).await?;
        let entry = self.entry(key);
        for (src, dst) in [
            (&artifacts.checksum, &entry.checksum),
            (&artifacts.essence, &entry.essence),
            (&artifacts.eprime, &entry.eprime),
        ] {
            self.install(src, dst).await?;
        }
        Ok(())
    }

    async fn install(&self, src: &Path, dst: &Path) -> io::Result<()> {
        let tmp = self.root.join(format!(".tmp-{}", Uuid::new_v4()));
        fs::copy(src, &tmp).await?;
        if let Err(e) = fs::rename(&tmp, dst).await {
            let _ = fs::remove_file(&tmp).await;
            return Err(e);
        }
        Ok(())
    }
}
