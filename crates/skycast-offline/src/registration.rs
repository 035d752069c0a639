//! Tracks which cache manager version is active and which is waiting.

use std::sync::Arc;

use parking_lot::RwLock;

use crate::error::OfflineResult;
use crate::fetcher::Fetcher;
use crate::lifecycle::{ControlMessage, LifecycleState};
use crate::manager::{OfflineCacheManager, ResponseSource, Served};
use crate::request::Request;

pub struct Registration {
    /// Used directly while no version is active
    fetcher: Arc<dyn Fetcher>,
    active: RwLock<Option<Arc<OfflineCacheManager>>>,
    waiting: RwLock<Option<Arc<OfflineCacheManager>>>,
}

impl std::fmt::Debug for Registration {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registration")
            .field("active", &self.active.read().as_ref().map(|m| m.cache_name().to_string()))
            .field("waiting", &self.waiting.read().as_ref().map(|m| m.cache_name().to_string()))
            .finish_non_exhaustive()
    }
}

impl Registration {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self {
            fetcher,
            active: RwLock::new(None),
            waiting: RwLock::new(None),
        }
    }

    /// Install `manager`, then activate it at once if nothing is active or
    /// it asked to skip waiting. Otherwise it waits for [`skip_waiting`](Self::skip_waiting).
    ///
    /// # Errors
    /// Fails if install or activation fails; the current active version is
    /// left in place.
    pub async fn register(&self, manager: OfflineCacheManager) -> OfflineResult<LifecycleState> {
        let manager = Arc::new(manager);
        manager.install().await?;

        let has_active = self.active.read().is_some();
        if !has_active || manager.wants_skip_waiting() {
            self.promote(&manager)?;
            // An older waiting version can never activate now
            if let Some(stale) = self.waiting.write().take() {
                stale.mark_redundant();
            }
        } else {
            tracing::info!("{} installed and waiting", manager.cache_name());
            if let Some(previous) = self.waiting.write().replace(Arc::clone(&manager)) {
                previous.mark_redundant();
            }
        }

        Ok(manager.state())
    }

    /// Make `manager` active straight from a bucket stored by an earlier run
    /// of the same version. Returns `false`, leaving the registration
    /// untouched, when the bucket is missing or incomplete.
    ///
    /// # Errors
    /// See [`OfflineCacheManager::resume`].
    pub fn resume(&self, manager: OfflineCacheManager) -> OfflineResult<bool> {
        if !manager.resume()? {
            return Ok(false);
        }
        let manager = Arc::new(manager);
        if let Some(previous) = self.active.write().replace(manager) {
            previous.mark_redundant();
        }
        Ok(true)
    }

    /// Activate the waiting version now. Returns `false` if none is waiting.
    ///
    /// # Errors
    /// Fails if activation fails; the version stays waiting.
    pub fn skip_waiting(&self) -> OfflineResult<bool> {
        let Some(waiting) = self.waiting.write().take() else {
            return Ok(false);
        };

        waiting.skip_waiting();
        if let Err(e) = self.promote(&waiting) {
            *self.waiting.write() = Some(waiting);
            return Err(e);
        }
        Ok(true)
    }

    /// Handle a message posted by the host page.
    ///
    /// # Errors
    /// Propagates failures of the command the message names.
    pub fn post_message(&self, message: &str) -> OfflineResult<bool> {
        match ControlMessage::parse(message) {
            Some(ControlMessage::SkipWaiting) => self.skip_waiting(),
            None => {
                tracing::debug!("Ignoring unknown control message {:?}", message);
                Ok(false)
            }
        }
    }

    fn promote(&self, manager: &Arc<OfflineCacheManager>) -> OfflineResult<()> {
        manager.activate()?;
        if let Some(previous) = self.active.write().replace(Arc::clone(manager)) {
            previous.mark_redundant();
        }
        Ok(())
    }

    pub fn active(&self) -> Option<Arc<OfflineCacheManager>> {
        self.active.read().clone()
    }

    pub fn waiting(&self) -> Option<Arc<OfflineCacheManager>> {
        self.waiting.read().clone()
    }

    /// Route a request through the active version, or straight to the
    /// network when none is active.
    ///
    /// # Errors
    /// See [`OfflineCacheManager::handle_fetch`].
    pub async fn handle_fetch(&self, request: &Request) -> OfflineResult<Served> {
        let active = self.active();
        match active {
            Some(manager) => manager.handle_fetch(request).await,
            None => Ok(Served {
                response: self.fetcher.fetch(request).await?,
                source: ResponseSource::Network,
            }),
        }
    }
}
