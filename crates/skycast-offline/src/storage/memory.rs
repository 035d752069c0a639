use std::collections::BTreeMap;

use parking_lot::RwLock;

use super::CacheStorage;
use crate::error::OfflineResult;
use crate::request::{HttpResponse, Request};

type Bucket = BTreeMap<String, HttpResponse>;

/// Volatile storage for tests and hosts without a cache dir.
#[derive(Debug, Default)]
pub struct MemoryCacheStorage {
    buckets: RwLock<BTreeMap<String, Bucket>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

impl CacheStorage for MemoryCacheStorage {
    fn open(&self, bucket: &str) -> OfflineResult<()> {
        self.buckets.write().entry(bucket.to_string()).or_default();
        Ok(())
    }

    fn put(&self, bucket: &str, request: &Request, response: &HttpResponse) -> OfflineResult<()> {
        self.buckets
            .write()
            .entry(bucket.to_string())
            .or_default()
            .insert(request.cache_key(), response.clone());
        Ok(())
    }

    fn match_in(&self, bucket: &str, request: &Request) -> OfflineResult<Option<HttpResponse>> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .and_then(|b| b.get(&request.cache_key()))
            .cloned())
    }

    fn delete(&self, bucket: &str) -> OfflineResult<bool> {
        Ok(self.buckets.write().remove(bucket).is_some())
    }

    fn keys(&self) -> OfflineResult<Vec<String>> {
        Ok(self.buckets.read().keys().cloned().collect())
    }

    fn entries(&self, bucket: &str) -> OfflineResult<Vec<String>> {
        Ok(self
            .buckets
            .read()
            .get(bucket)
            .map(|b| b.keys().cloned().collect())
            .unwrap_or_default())
    }
}
