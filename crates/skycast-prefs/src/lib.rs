//! Persisted user preferences for Skycast.
//!
//! A string key-value store ([`KeyValueStore`]) sits underneath a typed
//! [`Preferences`] service. Inject an in-memory store in tests and a
//! [`FileStore`] in the app.

pub mod preferences;
pub mod store;
pub mod types;

pub use preferences::{Preferences, MAX_RECENT_SEARCHES};
pub use store::{FileStore, KeyValueStore, MemoryStore, PrefsError, PrefsResult};
pub use types::{Coord, Language, SavedLocation, TemperatureUnit, TextDirection, Theme};
