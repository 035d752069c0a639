//! Typed preference service over a [`KeyValueStore`].

use std::sync::Arc;

use crate::store::{KeyValueStore, PrefsResult};
use crate::types::{Language, SavedLocation, TemperatureUnit, TextDirection, Theme};

/// Recent searches keep at most this many entries.
pub const MAX_RECENT_SEARCHES: usize = 5;

mod keys {
    pub const LAST_CITY: &str = "lastCity";
    pub const UNIT: &str = "temperatureUnit";
    pub const THEME: &str = "theme";
    pub const LANGUAGE: &str = "language";
    pub const USE_GEOLOCATION: &str = "useGeolocation";
    pub const FAVORITES: &str = "weatherFavorites";
    pub const RECENT_SEARCHES: &str = "weatherRecentSearches";
}

/// User preferences: unit, theme, language, geolocation, favorites and recents.
///
/// Cloning is cheap; clones share the same store.
pub struct Preferences {
    store: Arc<dyn KeyValueStore>,
}

impl Clone for Preferences {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
        }
    }
}

impl std::fmt::Debug for Preferences {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Preferences").finish_non_exhaustive()
    }
}

impl Preferences {
    pub fn new(store: Arc<dyn KeyValueStore>) -> Self {
        Self { store }
    }

    // ===== Unit =====

    pub fn unit(&self) -> TemperatureUnit {
        self.store
            .get(keys::UNIT)
            .and_then(|v| TemperatureUnit::parse(&v))
            .unwrap_or_default()
    }

    /// # Errors
    /// Fails if the store cannot persist the value.
    pub fn set_unit(&self, unit: TemperatureUnit) -> PrefsResult<()> {
        self.store.set(keys::UNIT, unit.as_str())
    }

    /// Flip between Celsius and Fahrenheit and return the new unit.
    ///
    /// # Errors
    /// Fails if the store cannot persist the value.
    pub fn toggle_unit(&self) -> PrefsResult<TemperatureUnit> {
        let next = self.unit().toggled();
        self.set_unit(next)?;
        Ok(next)
    }

    // ===== Theme =====

    pub fn theme(&self) -> Theme {
        match self.store.get(keys::THEME).as_deref() {
            Some("dark") => Theme::Dark,
            _ => Theme::Light,
        }
    }

    pub fn is_dark(&self) -> bool {
        self.theme() == Theme::Dark
    }

    /// # Errors
    /// Fails if the store cannot persist the value.
    pub fn toggle_theme(&self) -> PrefsResult<Theme> {
        let next = if self.is_dark() { Theme::Light } else { Theme::Dark };
        self.store.set(keys::THEME, next.as_str())?;
        Ok(next)
    }

    // ===== Language =====

    pub fn language(&self) -> Language {
        self.store
            .get(keys::LANGUAGE)
            .and_then(|code| Language::from_code(&code))
            .unwrap_or_default()
    }

    /// # Errors
    /// Fails if the store cannot persist the value.
    pub fn set_language(&self, language: Language) -> PrefsResult<()> {
        self.store.set(keys::LANGUAGE, language.code())
    }

    pub fn text_direction(&self) -> TextDirection {
        self.language().direction()
    }

    // ===== Geolocation =====

    pub fn use_geolocation(&self) -> bool {
        self.store.get(keys::USE_GEOLOCATION).as_deref() == Some("true")
    }

    /// # Errors
    /// Fails if the store cannot persist the value.
    pub fn set_use_geolocation(&self, enabled: bool) -> PrefsResult<()> {
        self.store
            .set(keys::USE_GEOLOCATION, if enabled { "true" } else { "false" })
    }

    // ===== Last city =====

    /// Last searched city, if one was saved.
    pub fn last_city(&self) -> Option<String> {
        self.store
            .get(keys::LAST_CITY)
            .filter(|c| !c.trim().is_empty())
    }

    /// # Errors
    /// Fails if the store cannot persist the value.
    pub fn set_last_city(&self, city: &str) -> PrefsResult<()> {
        self.store.set(keys::LAST_CITY, city)
    }

    // ===== Favorites =====

    pub fn favorites(&self) -> Vec<SavedLocation> {
        self.read_list(keys::FAVORITES)
    }

    /// Add a favorite. A city already present (same id) is left as is.
    ///
    /// Returns `true` if the list changed.
    ///
    /// # Errors
    /// Fails if the store cannot persist the list.
    pub fn add_favorite(&self, location: SavedLocation) -> PrefsResult<bool> {
        let mut favorites = self.favorites();
        if favorites.iter().any(|f| f.id == location.id) {
            return Ok(false);
        }
        favorites.push(location);
        self.write_list(keys::FAVORITES, &favorites)?;
        Ok(true)
    }

    /// Remove a favorite by city id. Unknown ids are a no-op.
    ///
    /// # Errors
    /// Fails if the store cannot persist the list.
    pub fn remove_favorite(&self, id: i64) -> PrefsResult<bool> {
        let mut favorites = self.favorites();
        let before = favorites.len();
        favorites.retain(|f| f.id != id);
        if favorites.len() == before {
            return Ok(false);
        }
        self.write_list(keys::FAVORITES, &favorites)?;
        Ok(true)
    }

    pub fn is_favorite(&self, id: i64) -> bool {
        self.favorites().iter().any(|f| f.id == id)
    }

    // ===== Recent searches =====

    /// Most recent first, at most [`MAX_RECENT_SEARCHES`].
    pub fn recent_searches(&self) -> Vec<SavedLocation> {
        self.read_list(keys::RECENT_SEARCHES)
    }

    /// Put `location` at the front, dropping any older entry with the same id
    /// and anything beyond the cap.
    ///
    /// # Errors
    /// Fails if the store cannot persist the list.
    pub fn add_recent_search(&self, location: SavedLocation) -> PrefsResult<()> {
        let previous = self.recent_searches();
        let mut recent = Vec::with_capacity(MAX_RECENT_SEARCHES);
        let id = location.id;
        recent.push(location);
        recent.extend(previous.into_iter().filter(|r| r.id != id));
        recent.truncate(MAX_RECENT_SEARCHES);
        self.write_list(keys::RECENT_SEARCHES, &recent)
    }

    /// # Errors
    /// Fails if the store cannot persist the list.
    pub fn clear_recent_searches(&self) -> PrefsResult<()> {
        self.write_list(keys::RECENT_SEARCHES, &[])
    }

    fn read_list(&self, key: &str) -> Vec<SavedLocation> {
        let Some(raw) = self.store.get(key) else {
            return Vec::new();
        };
        match serde_json::from_str(&raw) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Ignoring corrupted '{}' preference: {}", key, e);
                Vec::new()
            }
        }
    }

    fn write_list(&self, key: &str, list: &[SavedLocation]) -> PrefsResult<()> {
        let encoded = serde_json::to_string(list)?;
        self.store.set(key, &encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use crate::types::Coord;

    fn prefs() -> (Preferences, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new());
        (Preferences::new(store.clone()), store)
    }

    fn city(id: i64, name: &str) -> SavedLocation {
        SavedLocation {
            id,
            name: name.to_string(),
            country: "XX".to_string(),
            coord: Coord { lat: 1.0, lon: 2.0 },
        }
    }

    #[test]
    fn test_defaults() {
        let (prefs, _) = prefs();
        assert_eq!(prefs.unit(), TemperatureUnit::Celsius);
        assert_eq!(prefs.theme(), Theme::Light);
        assert_eq!(prefs.language(), Language::En);
        assert!(!prefs.use_geolocation());
        assert!(prefs.last_city().is_none());
        assert!(prefs.favorites().is_empty());
        assert!(prefs.recent_searches().is_empty());
    }

    #[test]
    fn test_unit_and_theme_toggle_persist() {
        let (prefs, store) = prefs();
        assert_eq!(prefs.toggle_unit().unwrap(), TemperatureUnit::Fahrenheit);
        assert_eq!(store.get("temperatureUnit").as_deref(), Some("fahrenheit"));

        assert_eq!(prefs.toggle_theme().unwrap(), Theme::Dark);
        assert_eq!(store.get("theme").as_deref(), Some("dark"));
        assert!(prefs.is_dark());
    }

    #[test]
    fn test_language_sets_direction() {
        let (prefs, _) = prefs();
        prefs.set_language(Language::Ar).unwrap();
        assert_eq!(prefs.text_direction(), TextDirection::Rtl);
        prefs.set_language(Language::Sv).unwrap();
        assert_eq!(prefs.text_direction(), TextDirection::Ltr);
    }

    #[test]
    fn test_geolocation_flag_is_string_encoded() {
        let (prefs, store) = prefs();
        prefs.set_use_geolocation(true).unwrap();
        assert_eq!(store.get("useGeolocation").as_deref(), Some("true"));
        assert!(prefs.use_geolocation());
    }

    #[test]
    fn test_unknown_stored_values_fall_back() {
        let (prefs, store) = prefs();
        store.set("temperatureUnit", "kelvin").unwrap();
        store.set("language", "xx").unwrap();
        assert_eq!(prefs.unit(), TemperatureUnit::Celsius);
        assert_eq!(prefs.language(), Language::En);
    }

    #[test]
    fn test_favorites_are_deduplicated() {
        let (prefs, _) = prefs();
        assert!(prefs.add_favorite(city(1, "London")).unwrap());
        assert!(!prefs.add_favorite(city(1, "London")).unwrap());
        assert_eq!(prefs.favorites().len(), 1);
        assert!(prefs.is_favorite(1));
    }

    #[test]
    fn test_remove_missing_favorite_is_noop() {
        let (prefs, _) = prefs();
        prefs.add_favorite(city(1, "London")).unwrap();
        assert!(!prefs.remove_favorite(42).unwrap());
        assert_eq!(prefs.favorites().len(), 1);
        assert!(prefs.remove_favorite(1).unwrap());
        assert!(!prefs.is_favorite(1));
    }

    #[test]
    fn test_recent_searches_bounded_dedup_most_recent_first() {
        let (prefs, _) = prefs();
        for (id, name) in [(1, "A"), (2, "B"), (3, "C"), (1, "A"), (4, "D"), (5, "E"), (6, "F"), (3, "C")] {
            prefs.add_recent_search(city(id, name)).unwrap();
        }

        let recent = prefs.recent_searches();
        let ids: Vec<i64> = recent.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![3, 6, 5, 4, 1]);
    }

    #[test]
    fn test_clear_recent_searches_keeps_favorites() {
        let (prefs, _) = prefs();
        prefs.add_favorite(city(1, "London")).unwrap();
        prefs.add_recent_search(city(2, "Paris")).unwrap();
        prefs.clear_recent_searches().unwrap();
        assert!(prefs.recent_searches().is_empty());
        assert_eq!(prefs.favorites().len(), 1);
    }

    #[test]
    fn test_corrupted_list_reads_as_empty() {
        let (prefs, store) = prefs();
        store.set("weatherFavorites", "[{broken").unwrap();
        assert!(prefs.favorites().is_empty());
        prefs.add_favorite(city(7, "Oslo")).unwrap();
        assert_eq!(prefs.favorites().len(), 1);
    }

    #[test]
    fn test_blank_last_city_counts_as_unset() {
        let (prefs, _) = prefs();
        prefs.set_last_city("  ").unwrap();
        assert!(prefs.last_city().is_none());
        prefs.set_last_city("Stockholm").unwrap();
        assert_eq!(prefs.last_city().as_deref(), Some("Stockholm"));
    }
}
