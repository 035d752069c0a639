//! Offline cache manager for Skycast.
//!
//! Precaches the app shell per versioned cache bucket, prunes old versions
//! on activation, and answers same-origin GET requests network-first for
//! navigations and cache-first for static assets. Cross-origin requests
//! (the weather API) always go to the network and are never cached.

pub mod error;
pub mod fetcher;
pub mod lifecycle;
pub mod manager;
pub mod registration;
pub mod request;
pub mod storage;

pub use error::{OfflineError, OfflineResult};
pub use fetcher::{Fetcher, ReqwestFetcher};
pub use lifecycle::{
    ControlMessage, LifecycleState, OfflineSettings, DEFAULT_CACHE_PREFIX, DEFAULT_PRECACHE,
    DEFAULT_VERSION,
};
pub use manager::{OfflineCacheManager, ResponseSource, Served, Strategy};
pub use registration::Registration;
pub use request::{HttpResponse, Request, RequestMode, ResponseType};
pub use storage::{CacheStorage, DiskCacheStorage, MemoryCacheStorage};
