//! src/services/media_store.rs
//!
//! MediaStore: binary resources behind attachment posts. Payloads live on
//! local disk sharded beneath `base_path/{blog_id}/{shard}/{shard}/{key}` and
//! are addressed publicly as `http://{domain}{path}files/{key}`.
//!
//! Re-hosting streams a resource from wherever its locator points (another
//! site's media directory, a `file://` path or an `http(s)://` URL) into the
//! destination site's directory and hands back the new locator.

use crate::{
    models::site::Site,
    services::content_store::{StorageError, StorageResult},
};
use bytes::Bytes;
use chrono::{Datelike, Utc};
use futures::{Stream, StreamExt, TryStreamExt, pin_mut};
use md5::Context;
use std::{
    io::{self, ErrorKind},
    path::{Path, PathBuf},
};
use tokio::{
    fs::{self, File},
    io::AsyncWriteExt,
};
use tokio_util::io::ReaderStream;
use tracing::debug;
use uuid::Uuid;

const MAX_MEDIA_KEY_LEN: usize = 1024;
const MAX_NAME_ATTEMPTS: usize = 1000;

/// A payload written into a site's media directory.
#[derive(Debug, Clone)]
pub struct StoredMedia {
    /// Key relative to the site's `files/` root, e.g. `2024/05/photo.png`.
    pub key: String,
    /// Public locator of the payload.
    pub locator: String,
    pub size_bytes: i64,
    /// Hex MD5 of the payload.
    pub etag: String,
}

/// Where a locator's bytes can be read from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceSource {
    Local(PathBuf),
    Remote(String),
}

#[derive(Clone)]
pub struct MediaStore {
    /// Base directory on disk where media payloads are stored.
    pub base_path: PathBuf,
    http: reqwest::Client,
}

impl MediaStore {
    pub fn new(base_path: impl Into<PathBuf>) -> Self {
        Self {
            base_path: base_path.into(),
            http: reqwest::Client::new(),
        }
    }

    /// Rejects keys that are empty, absolute, contain `..` or control bytes.
    fn ensure_key_safe(&self, key: &str) -> StorageResult<()> {
        if key.is_empty() || key.len() > MAX_MEDIA_KEY_LEN {
            return Err(StorageError::UnsupportedLocator(key.to_string()));
        }
        if key.starts_with('/') || key.contains("..") {
            return Err(StorageError::UnsupportedLocator(key.to_string()));
        }
        if key
            .bytes()
            .any(|b| b.is_ascii_control() || b == b'\\' || b == b'\0')
        {
            return Err(StorageError::UnsupportedLocator(key.to_string()));
        }
        Ok(())
    }

    /// Root folder of one site's media. Not checked for existence.
    pub fn site_root(&self, blog_id: i64) -> PathBuf {
        self.base_path.join(blog_id.to_string())
    }

    /// Two-level shard identifiers from MD5(blog_id/key).
    fn media_shards(blog_id: i64, key: &str) -> (String, String) {
        let digest = md5::compute(format!("{}/{}", blog_id, key));
        (format!("{:02x}", digest[0]), format!("{:02x}", digest[1]))
    }

    /// Fully-qualified payload path. Parent directories may not exist yet.
    pub fn media_path(&self, blog_id: i64, key: &str) -> PathBuf {
        let (shard_a, shard_b) = Self::media_shards(blog_id, key);
        let mut path = self.site_root(blog_id);
        path.push(shard_a);
        path.push(shard_b);
        path.push(key);
        path
    }

    /// Work out where a locator's bytes live.
    ///
    /// Locators under a known site's `files/` prefix resolve to that site's
    /// media directory; the scheme is ignored for that comparison.
    pub fn resolve(&self, locator: &str, sites: &[Site]) -> StorageResult<ResourceSource> {
        let bare = strip_scheme(locator);
        for site in sites {
            let prefix = strip_scheme(&site.media_url_prefix()).to_string();
            if let Some(key) = bare.strip_prefix(prefix.as_str()) {
                let key = key.split(['?', '#']).next().unwrap_or(key);
                self.ensure_key_safe(key)?;
                return Ok(ResourceSource::Local(self.media_path(site.blog_id, key)));
            }
        }

        if let Some(path) = locator.strip_prefix("file://") {
            return Ok(ResourceSource::Local(PathBuf::from(path)));
        }
        if locator.starts_with("http://") || locator.starts_with("https://") {
            return Ok(ResourceSource::Remote(locator.to_string()));
        }

        Err(StorageError::UnsupportedLocator(locator.to_string()))
    }

    /// Copy the resource behind `locator` into `dest`'s media directory.
    pub async fn rehost(&self, locator: &str, sites: &[Site], dest: &Site) -> StorageResult<StoredMedia> {
        let filename = filename_from_locator(locator);
        match self.resolve(locator, sites)? {
            ResourceSource::Local(path) => {
                debug!("re-hosting {} from {}", locator, path.display());
                let file = File::open(&path).await.map_err(|err| {
                    if err.kind() == ErrorKind::NotFound {
                        StorageError::Fetch(format!("{} not found", locator))
                    } else {
                        StorageError::Io(err)
                    }
                })?;
                self.store_stream(dest, &filename, ReaderStream::new(file))
                    .await
            }
            ResourceSource::Remote(url) => {
                debug!("re-hosting {} over HTTP", url);
                let response = self
                    .http
                    .get(&url)
                    .send()
                    .await
                    .and_then(|resp| resp.error_for_status())
                    .map_err(|err| StorageError::Fetch(err.to_string()))?;
                let stream = response.bytes_stream().map_err(io::Error::other);
                self.store_stream(dest, &filename, stream).await
            }
        }
    }

    /// Stream a payload into `site`'s media directory under a dated key.
    ///
    /// - Writes bytes incrementally to a temporary file.
    /// - Computes MD5/etag and size while streaming.
    /// - Renames into the final location once flushed and synced.
    ///
    /// Existing payloads are never overwritten: a numeric suffix is added to
    /// the file name until the key is free.
    pub async fn store_stream<S>(&self, site: &Site, filename: &str, stream: S) -> StorageResult<StoredMedia>
    where
        S: Stream<Item = io::Result<Bytes>>,
    {
        let now = Utc::now();
        let dir_key = format!("{:04}/{:02}", now.year(), now.month());
        let key = self.free_key(site.blog_id, &dir_key, filename).await?;
        self.ensure_key_safe(&key)?;

        let file_path = self.media_path(site.blog_id, &key);
        let parent = file_path.parent().map(Path::to_path_buf).ok_or_else(|| {
            StorageError::Io(io::Error::new(
                ErrorKind::Other,
                "media path missing parent directory",
            ))
        })?;
        fs::create_dir_all(&parent).await?;
        let tmp_path = parent.join(format!(".tmp-{}", Uuid::new_v4()));
        let mut file = File::create(&tmp_path).await?;

        let mut size_bytes: i64 = 0;
        let mut digest = Context::new();
        pin_mut!(stream);
        while let Some(chunk_res) = stream.next().await {
            let chunk = match chunk_res {
                Ok(chunk) => chunk,
                Err(err) => {
                    let _ = fs::remove_file(&tmp_path).await;
                    return Err(StorageError::Fetch(err.to_string()));
                }
            };
            size_bytes += chunk.len() as i64;
            digest.consume(&chunk);
            if let Err(err) = file.write_all(&chunk).await {
                let _ = fs::remove_file(&tmp_path).await;
                return Err(StorageError::Io(err));
            }
        }
        if let Err(err) = file.flush().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = file.sync_all().await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }
        if let Err(err) = fs::rename(&tmp_path, &file_path).await {
            let _ = fs::remove_file(&tmp_path).await;
            return Err(StorageError::Io(err));
        }

        let locator = format!("{}{}", site.media_url_prefix(), key);
        debug!("stored {} bytes at {}", size_bytes, locator);
        Ok(StoredMedia {
            key,
            locator,
            size_bytes,
            etag: format!("{:x}", digest.compute()),
        })
    }

    /// First key of the form `dir/name`, `dir/name-1`, ... with no payload.
    async fn free_key(&self, blog_id: i64, dir_key: &str, filename: &str) -> StorageResult<String> {
        let (stem, ext) = match filename.rsplit_once('.') {
            Some((stem, ext)) if !stem.is_empty() => (stem, Some(ext)),
            _ => (filename, None),
        };
        for attempt in 0..MAX_NAME_ATTEMPTS {
            let name = match (attempt, ext) {
                (0, _) => filename.to_string(),
                (n, Some(ext)) => format!("{}-{}.{}", stem, n, ext),
                (n, None) => format!("{}-{}", stem, n),
            };
            let key = format!("{}/{}", dir_key, name);
            if !fs::try_exists(self.media_path(blog_id, &key)).await? {
                return Ok(key);
            }
        }
        Err(StorageError::Io(io::Error::new(
            ErrorKind::AlreadyExists,
            format!("no free media name for {}", filename),
        )))
    }

    /// Remove a site's whole media directory. Missing directories are fine.
    pub async fn remove_site(&self, blog_id: i64) -> StorageResult<()> {
        let root = self.site_root(blog_id);
        match fs::remove_dir_all(&root).await {
            Ok(_) => debug!("removed media directory {}", root.display()),
            Err(err) if err.kind() == ErrorKind::NotFound => {
                debug!("media directory {} already missing", root.display());
            }
            Err(err) => return Err(StorageError::Io(err)),
        }
        Ok(())
    }
}

fn strip_scheme(locator: &str) -> &str {
    locator
        .strip_prefix("http://")
        .or_else(|| locator.strip_prefix("https://"))
        .unwrap_or(locator)
}

/// Last path segment of a locator, reduced to a safe file name.
fn filename_from_locator(locator: &str) -> String {
    let path = locator.split(['?', '#']).next().unwrap_or(locator);
    let raw = path.rsplit('/').next().unwrap_or(path);
    let cleaned: String = raw
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '-'
            }
        })
        .collect();
    let cleaned = cleaned.trim_matches('.').to_string();
    if cleaned.is_empty() {
        "file".to_string()
    } else {
        cleaned
    }
}
