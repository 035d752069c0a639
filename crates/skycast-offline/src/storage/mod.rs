//! Named-bucket response storage.
//!
//! Buckets are append/delete only and keyed by [`Request::cache_key`].

mod disk;
mod memory;

pub use disk::DiskCacheStorage;
pub use memory::MemoryCacheStorage;

use crate::error::OfflineResult;
use crate::request::{HttpResponse, Request};

pub trait CacheStorage: Send + Sync {
    /// Create the bucket if it does not exist.
    ///
    /// # Errors
    /// Fails if the bucket cannot be created.
    fn open(&self, bucket: &str) -> OfflineResult<()>;

    /// Store `response` under `request`, creating the bucket if needed.
    ///
    /// # Errors
    /// Fails if the entry cannot be written.
    fn put(&self, bucket: &str, request: &Request, response: &HttpResponse) -> OfflineResult<()>;

    /// # Errors
    /// Fails if the bucket exists but cannot be read.
    fn match_in(&self, bucket: &str, request: &Request) -> OfflineResult<Option<HttpResponse>>;

    /// Returns `true` if the bucket existed.
    ///
    /// # Errors
    /// Fails if the bucket exists but cannot be removed.
    fn delete(&self, bucket: &str) -> OfflineResult<bool>;

    /// Bucket names.
    ///
    /// # Errors
    /// Fails if the storage cannot be enumerated.
    fn keys(&self) -> OfflineResult<Vec<String>>;

    /// Cache keys stored in `bucket`; empty for an unknown bucket.
    ///
    /// # Errors
    /// Fails if the bucket exists but cannot be read.
    fn entries(&self, bucket: &str) -> OfflineResult<Vec<String>>;

    /// First match across all buckets, in [`keys`](Self::keys) order.
    /// Unreadable buckets are logged and skipped.
    ///
    /// # Errors
    /// Fails only if the bucket names cannot be enumerated.
    fn match_any(&self, request: &Request) -> OfflineResult<Option<HttpResponse>> {
        for bucket in self.keys()? {
            match self.match_in(&bucket, request) {
                Ok(Some(found)) => return Ok(Some(found)),
                Ok(None) => {}
                Err(e) => tracing::warn!("Skipping unreadable cache bucket {}: {}", bucket, e),
            }
        }
        Ok(None)
    }
}
