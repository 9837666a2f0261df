//! Downloading and caching firmware artifacts.

use std::collections::HashMap;
use std::fs;
use std::path::{Component, Path, PathBuf};

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use tracing::{debug, info, warn};

#[cfg(test)]
use mockall::automock;

use crate::error::{ConsoleError, ConsoleResult};

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CachedArtifact {
    pub url: String,
    pub sha256_hash: String,
    pub file_name: String,
    pub file_size: u64,
    pub downloaded_at: String,
}

/// Cache index keyed by artifact URL.
pub type ArtifactIndex = HashMap<String, CachedArtifact>;

/// Downloaded binaries on disk plus a JSON index with their digests.
pub struct ArtifactCache {
    cache_dir: PathBuf,
    index_path: PathBuf,
}

impl ArtifactCache {
    pub fn new(app_data_dir: &Path) -> Self {
        let cache_dir = app_data_dir.join("artifacts");
        let index_path = cache_dir.join("artifact_cache.json");
        Self {
            cache_dir,
            index_path,
        }
    }

    /// Calculate SHA256 hash of a byte slice as lowercase hex.
    pub fn calculate_sha256(data: &[u8]) -> String {
        hex::encode(Sha256::digest(data))
    }

    /// Load the cache index from disk
    pub fn load_index(&self) -> ConsoleResult<ArtifactIndex> {
        if !self.index_path.exists() {
            return Ok(HashMap::new());
        }

        let contents = fs::read_to_string(&self.index_path)?;
        if contents.trim().is_empty() {
            return Ok(HashMap::new());
        }
        Ok(serde_json::from_str(&contents)?)
    }

    /// Save the cache index to disk
    pub fn save_index(&self, index: &ArtifactIndex) -> ConsoleResult<()> {
        fs::create_dir_all(&self.cache_dir)?;
        fs::write(&self.index_path, serde_json::to_string_pretty(index)?)?;
        Ok(())
    }

    fn file_name_for(url: &str) -> String {
        format!("{}.bin", Self::calculate_sha256(url.as_bytes()))
    }

    /// Cached bytes for `url`, re-verified against the recorded digest.
    ///
    /// Missing or corrupt entries are evicted and reported as a miss.
    pub fn get(&self, url: &str) -> ConsoleResult<Option<Vec<u8>>> {
        let index = self.load_index()?;
        let Some(entry) = index.get(url) else {
            return Ok(None);
        };

        let path = self.cache_dir.join(&entry.file_name);
        let data = match fs::read(&path) {
            Ok(data) => data,
            Err(e) => {
                warn!("Cached artifact for {} unreadable: {}", url, e);
                self.remove(url)?;
                return Ok(None);
            }
        };

        if Self::calculate_sha256(&data) != entry.sha256_hash {
            warn!("Cached artifact for {} failed integrity check; evicting", url);
            self.remove(url)?;
            return Ok(None);
        }

        Ok(Some(data))
    }

    /// Store `data` for `url` and record it in the index.
    pub fn put(&self, url: &str, data: &[u8]) -> ConsoleResult<CachedArtifact> {
        fs::create_dir_all(&self.cache_dir)?;
        let file_name = Self::file_name_for(url);
        fs::write(self.cache_dir.join(&file_name), data)?;

        let entry = CachedArtifact {
            url: url.to_string(),
            sha256_hash: Self::calculate_sha256(data),
            file_name,
            file_size: data.len() as u64,
            downloaded_at: chrono::Utc::now().to_rfc3339(),
        };

        let mut index = self.load_index()?;
        index.insert(url.to_string(), entry.clone());
        self.save_index(&index)?;
        Ok(entry)
    }

    /// Remove an entry and its file.
    pub fn remove(&self, url: &str) -> ConsoleResult<()> {
        let mut index = self.load_index()?;
        if let Some(entry) = index.remove(url) {
            let path = self.cache_dir.join(&entry.file_name);
            if path.exists() {
                fs::remove_file(path)?;
            }
            self.save_index(&index)?;
        }
        Ok(())
    }

    /// Clear all entries from the cache
    pub fn clear(&self) -> ConsoleResult<()> {
        for url in self.load_index()?.into_keys() {
            self.remove(&url)?;
        }
        Ok(())
    }
}

/// Where update binaries come from when the SDK cannot fetch them itself.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait ArtifactSource: Send + Sync {
    async fn download(&self, url: String) -> ConsoleResult<Vec<u8>>;
}

/// HTTP downloader with an optional on-disk cache in front.
pub struct HttpArtifactSource {
    client: Client,
    cache: Option<ArtifactCache>,
}

impl HttpArtifactSource {
    pub fn new(client: Client, cache: Option<ArtifactCache>) -> Self {
        Self { client, cache }
    }
}

#[async_trait]
impl ArtifactSource for HttpArtifactSource {
    async fn download(&self, url: String) -> ConsoleResult<Vec<u8>> {
        if let Some(cache) = &self.cache {
            match cache.get(&url) {
                Ok(Some(data)) => {
                    debug!("Artifact cache hit for {}", url);
                    return Ok(data);
                }
                Ok(None) => {}
                Err(e) => warn!("Artifact cache lookup failed: {}", e),
            }
        }

        info!("Downloading artifact {}", url);
        let response = self.client.get(&url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ConsoleError::DownloadFailed {
                url,
                status: status.as_u16(),
            });
        }

        let data = response.bytes().await?.to_vec();
        if let Some(cache) = &self.cache {
            if let Err(e) = cache.put(&url, &data) {
                warn!("Failed to cache artifact {}: {}", url, e);
            }
        }
        Ok(data)
    }
}

/// Reads bundled firmware files by name from a resource directory.
pub struct ResourceReader {
    dir: PathBuf,
}

impl ResourceReader {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Read `name`, which must be a plain file name inside the directory.
    pub async fn read(&self, name: &str) -> ConsoleResult<Vec<u8>> {
        let mut components = Path::new(name).components();
        let valid = matches!(
            (components.next(), components.next()),
            (Some(Component::Normal(_)), None)
        );
        if !valid {
            return Err(ConsoleError::InvalidResourceName {
                name: name.to_string(),
            });
        }
        Ok(tokio::fs::read(self.dir.join(name)).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_put_and_get() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());

        assert_eq!(cache.get("https://example.com/a.bin").unwrap(), None);

        let entry = cache.put("https://example.com/a.bin", b"firmware").unwrap();
        assert_eq!(entry.file_size, 8);
        assert_eq!(entry.sha256_hash, ArtifactCache::calculate_sha256(b"firmware"));

        let data = cache.get("https://example.com/a.bin").unwrap();
        assert_eq!(data.as_deref(), Some(&b"firmware"[..]));
    }

    #[test]
    fn test_corrupt_entry_is_evicted() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        let entry = cache.put("https://example.com/a.bin", b"firmware").unwrap();

        fs::write(dir.path().join("artifacts").join(&entry.file_name), b"tampered").unwrap();

        assert_eq!(cache.get("https://example.com/a.bin").unwrap(), None);
        assert!(cache.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_clear() {
        let dir = tempdir().unwrap();
        let cache = ArtifactCache::new(dir.path());
        cache.put("https://example.com/a.bin", b"a").unwrap();
        cache.put("https://example.com/b.bin", b"b").unwrap();

        cache.clear().unwrap();
        assert!(cache.load_index().unwrap().is_empty());
    }

    #[test]
    fn test_sha256_known_value() {
        assert_eq!(
            ArtifactCache::calculate_sha256(b""),
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[tokio::test]
    async fn test_http_source_uses_cache() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/fw.bin")
            .with_status(200)
            .with_body(b"binary".to_vec())
            .expect(1)
            .create_async()
            .await;

        let dir = tempdir().unwrap();
        let source = HttpArtifactSource::new(Client::new(), Some(ArtifactCache::new(dir.path())));
        let url = format!("{}/fw.bin", server.url());

        assert_eq!(source.download(url.clone()).await.unwrap(), b"binary");
        assert_eq!(source.download(url).await.unwrap(), b"binary");
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_http_source_reports_status() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server.mock("GET", "/gone.bin").with_status(404).create_async().await;

        let source = HttpArtifactSource::new(Client::new(), None);
        let err = source
            .download(format!("{}/gone.bin", server.url()))
            .await
            .unwrap_err();
        assert!(matches!(err, ConsoleError::DownloadFailed { status: 404, .. }));
    }

    #[tokio::test]
    async fn test_resource_reader_rejects_traversal() {
        let dir = tempdir().unwrap();
        fs::write(dir.path().join("touch.bin"), b"abc").unwrap();
        let reader = ResourceReader::new(dir.path());

        assert_eq!(reader.read("touch.bin").await.unwrap(), b"abc");
        for bad in ["../etc/passwd", "/abs.bin", "sub/dir.bin", ""] {
            assert!(matches!(
                reader.read(bad).await,
                Err(ConsoleError::InvalidResourceName { .. })
            ));
        }
    }
}
