use std::fmt;

use url::Url;

pub const DEFAULT_CACHE_PREFIX: &str = "weather-dashboard-";
pub const DEFAULT_VERSION: &str = "2.2.0";
pub const DEFAULT_PRECACHE: &[&str] = &["/", "/manifest.json", "/favicon.ico", "/logo192.png"];

/// Where a cache manager version is in its life
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LifecycleState {
    Parsed,
    Installing,
    Installed,
    Activating,
    Activated,
    /// Failed to install, or replaced by a newer version
    Redundant,
}

impl fmt::Display for LifecycleState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Parsed => "parsed",
            Self::Installing => "installing",
            Self::Installed => "installed",
            Self::Activating => "activating",
            Self::Activated => "activated",
            Self::Redundant => "redundant",
        };
        f.write_str(s)
    }
}

/// Commands the host page can post to the registration
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ControlMessage {
    /// Activate the waiting version now
    SkipWaiting,
}

impl ControlMessage {
    pub fn parse(message: &str) -> Option<Self> {
        match message.trim() {
            "SKIP_WAITING" => Some(Self::SkipWaiting),
            _ => None,
        }
    }
}

/// One cache version's configuration
#[derive(Debug, Clone)]
pub struct OfflineSettings {
    /// Origin of the app; only requests to it are cached
    pub origin: Url,
    pub cache_prefix: String,
    pub version: String,
    /// Paths fetched and stored on install, relative to `origin`
    pub precache: Vec<String>,
    /// Activate as soon as installed instead of waiting
    pub skip_waiting: bool,
}

impl OfflineSettings {
    pub fn new(origin: Url) -> Self {
        Self {
            origin,
            cache_prefix: DEFAULT_CACHE_PREFIX.to_string(),
            version: DEFAULT_VERSION.to_string(),
            precache: DEFAULT_PRECACHE.iter().map(|p| p.to_string()).collect(),
            skip_waiting: true,
        }
    }

    pub fn with_version(mut self, version: impl Into<String>) -> Self {
        self.version = version.into();
        self
    }

    pub fn with_precache(mut self, precache: Vec<String>) -> Self {
        self.precache = precache;
        self
    }

    pub fn with_skip_waiting(mut self, skip_waiting: bool) -> Self {
        self.skip_waiting = skip_waiting;
        self
    }

    /// Bucket name for this version, e.g. `weather-dashboard-2.2.0`
    pub fn cache_name(&self) -> String {
        format!("{}{}", self.cache_prefix, self.version)
    }
}
