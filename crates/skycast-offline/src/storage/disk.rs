//! On-disk bucket storage.
//!
//! ```text
//! <root>/<bucket>/index.json   bucket name + entry metadata
//! <root>/<bucket>/<n>.body     response bodies
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};

use super::CacheStorage;
use crate::error::{OfflineError, OfflineResult};
use crate::request::{HttpResponse, Request, ResponseType};

const INDEX_FILE: &str = "index.json";

#[derive(Debug, Default, Serialize, Deserialize)]
struct BucketIndex {
    name: String,
    next_id: u64,
    entries: BTreeMap<String, IndexEntry>,
}

#[derive(Debug, Serialize, Deserialize)]
struct IndexEntry {
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    response_type: ResponseType,
    body_file: String,
}

#[derive(Debug)]
pub struct DiskCacheStorage {
    root: PathBuf,
    write_lock: Mutex<()>,
}

impl DiskCacheStorage {
    /// # Errors
    /// Fails if `root` cannot be created.
    pub fn new(root: impl Into<PathBuf>) -> OfflineResult<Self> {
        let root = root.into();
        fs::create_dir_all(&root).map_err(|e| OfflineError::storage(&root, e))?;
        Ok(Self {
            root,
            write_lock: Mutex::new(()),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn bucket_dir(&self, bucket: &str) -> PathBuf {
        let safe: String = bucket
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.root.join(safe)
    }

    fn load_index(dir: &Path) -> OfflineResult<Option<BucketIndex>> {
        let path = dir.join(INDEX_FILE);
        if !path.exists() {
            return Ok(None);
        }
        let contents = fs::read_to_string(&path).map_err(|e| OfflineError::storage(&path, e))?;
        Ok(Some(serde_json::from_str(&contents)?))
    }

    fn save_index(dir: &Path, index: &BucketIndex) -> OfflineResult<()> {
        let path = dir.join(INDEX_FILE);
        let tmp = dir.join(format!("{}.tmp", INDEX_FILE));
        let contents = serde_json::to_string_pretty(index)?;
        fs::write(&tmp, contents).map_err(|e| OfflineError::storage(&tmp, e))?;
        fs::rename(&tmp, &path).map_err(|e| OfflineError::storage(&path, e))
    }

    /// Existing index, or a fresh one if missing or unreadable.
    fn index_for_write(dir: &Path, bucket: &str) -> BucketIndex {
        match Self::load_index(dir) {
            Ok(Some(index)) => index,
            Ok(None) => BucketIndex {
                name: bucket.to_string(),
                ..BucketIndex::default()
            },
            Err(e) => {
                tracing::warn!("Resetting unreadable cache bucket {}: {}", bucket, e);
                BucketIndex {
                    name: bucket.to_string(),
                    ..BucketIndex::default()
                }
            }
        }
    }
}

impl CacheStorage for DiskCacheStorage {
    fn open(&self, bucket: &str) -> OfflineResult<()> {
        let _guard = self.write_lock.lock();
        let dir = self.bucket_dir(bucket);
        if dir.join(INDEX_FILE).exists() {
            return Ok(());
        }
        fs::create_dir_all(&dir).map_err(|e| OfflineError::storage(&dir, e))?;
        Self::save_index(&dir, &Self::index_for_write(&dir, bucket))
    }

    fn put(&self, bucket: &str, request: &Request, response: &HttpResponse) -> OfflineResult<()> {
        let _guard = self.write_lock.lock();
        let dir = self.bucket_dir(bucket);
        fs::create_dir_all(&dir).map_err(|e| OfflineError::storage(&dir, e))?;

        let mut index = Self::index_for_write(&dir, bucket);
        let body_file = format!("{}.body", index.next_id);
        index.next_id += 1;

        let body_path = dir.join(&body_file);
        fs::write(&body_path, &response.body).map_err(|e| OfflineError::storage(&body_path, e))?;

        let replaced = index.entries.insert(
            request.cache_key(),
            IndexEntry {
                url: response.url.clone(),
                status: response.status,
                headers: response.headers.clone(),
                response_type: response.response_type,
                body_file,
            },
        );
        Self::save_index(&dir, &index)?;

        if let Some(old) = replaced {
            let stale = dir.join(old.body_file);
            if let Err(e) = fs::remove_file(&stale) {
                tracing::warn!("Failed to remove replaced body {}: {}", stale.display(), e);
            }
        }
        Ok(())
    }

    fn match_in(&self, bucket: &str, request: &Request) -> OfflineResult<Option<HttpResponse>> {
        let dir = self.bucket_dir(bucket);
        let Some(index) = Self::load_index(&dir)? else {
            return Ok(None);
        };
        let Some(entry) = index.entries.get(&request.cache_key()) else {
            return Ok(None);
        };

        let body_path = dir.join(&entry.body_file);
        let body = match fs::read(&body_path) {
            Ok(body) => body,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::warn!("Cache entry {} lost its body file", entry.url);
                return Ok(None);
            }
            Err(e) => return Err(OfflineError::storage(&body_path, e)),
        };

        Ok(Some(HttpResponse {
            url: entry.url.clone(),
            status: entry.status,
            headers: entry.headers.clone(),
            body,
            response_type: entry.response_type,
        }))
    }

    fn delete(&self, bucket: &str) -> OfflineResult<bool> {
        let _guard = self.write_lock.lock();
        let dir = self.bucket_dir(bucket);
        if !dir.exists() {
            return Ok(false);
        }
        fs::remove_dir_all(&dir).map_err(|e| OfflineError::storage(&dir, e))?;
        Ok(true)
    }

    fn keys(&self) -> OfflineResult<Vec<String>> {
        let read_dir = fs::read_dir(&self.root).map_err(|e| OfflineError::storage(&self.root, e))?;

        let mut names = Vec::new();
        for entry in read_dir {
            let entry = entry.map_err(|e| OfflineError::storage(&self.root, e))?;
            let dir = entry.path();
            if !dir.join(INDEX_FILE).exists() {
                continue;
            }
            // A corrupted index still names a bucket that activate must be able to delete
            let name = match Self::load_index(&dir) {
                Ok(Some(index)) => index.name,
                _ => entry.file_name().to_string_lossy().into_owned(),
            };
            names.push(name);
        }
        names.sort();
        Ok(names)
    }

    fn entries(&self, bucket: &str) -> OfflineResult<Vec<String>> {
        Ok(Self::load_index(&self.bucket_dir(bucket))?
            .map(|index| index.entries.into_keys().collect())
            .unwrap_or_default())
    }
}
