//! Preference manager that layers stored values over config.toml defaults.
//!
//! Config values serve as defaults; values in local storage override them.
//! Writes always go to storage, never to the config file.
use std::collections::HashMap;

use anyhow::Result;

use crate::config::Config;
use crate::storage::{Database, StoredValueError, LOCATION_KEY, THEME_KEY};
use crate::theme::ThemeVariant;

/// Storage keys that are layered over config defaults.
const STORED_KEYS: [&str; 2] = [THEME_KEY, LOCATION_KEY];

// ============================================================================
// PreferenceManager
// ============================================================================

/// Merged preference store: config defaults + stored overrides.
///
/// Reads are in-memory. Writes persist to storage and update the map.
pub struct PreferenceManager {
    prefs: HashMap<String, String>,
}

impl PreferenceManager {
    /// Load preferences by merging config defaults with stored overrides.
    pub async fn load(config: &Config, db: &Database) -> Result<Self> {
        let mut prefs = Self::flatten_config(config);

        for key in STORED_KEYS {
            if let Some(value) = db.get_item(key).await? {
                prefs.insert(key.to_string(), value);
            }
        }

        Ok(Self { prefs })
    }

    /// Create from config only. Fallback for when storage cannot be read.
    pub fn from_config(config: &Config) -> Self {
        Self {
            prefs: Self::flatten_config(config),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.prefs.get(key).map(String::as_str)
    }

    /// Set a preference: writes to storage and updates the in-memory map.
    pub async fn set(&mut self, db: &Database, key: &str, value: &str) -> Result<()> {
        db.set_item(key, value).await?;
        self.prefs.insert(key.to_string(), value.to_string());
        Ok(())
    }

    /// Apply another context's write without persisting it.
    ///
    /// A removed theme falls back to the config default.
    pub fn apply_external(&mut self, config: &Config, key: &str, value: Option<&str>) {
        match value {
            Some(v) => {
                self.prefs.insert(key.to_string(), v.to_string());
            }
            None => match Self::flatten_config(config).remove(key) {
                Some(default) => {
                    self.prefs.insert(key.to_string(), default);
                }
                None => {
                    self.prefs.remove(key);
                }
            },
        }
    }

    // ========================================================================
    // Type-safe Accessors
    // ========================================================================

    /// Current theme. An unrecognized stored name falls back to light.
    pub fn theme_variant(&self) -> ThemeVariant {
        let Some(name) = self.get(THEME_KEY) else {
            return ThemeVariant::default();
        };
        ThemeVariant::from_str_name(name).unwrap_or_else(|| {
            let e = StoredValueError::new(THEME_KEY, format!("unknown theme '{}'", name));
            tracing::warn!(error = %e, "Using default theme");
            ThemeVariant::default()
        })
    }

    pub async fn set_theme(&mut self, db: &Database, variant: ThemeVariant) -> Result<()> {
        self.set(db, THEME_KEY, variant.as_str()).await
    }

    /// Last written list location, if any.
    pub fn location(&self) -> Option<&str> {
        self.get(LOCATION_KEY)
    }

    /// Whether to restore the last location on startup.
    pub fn restore_location(&self) -> bool {
        self.get("restore_location")
            .and_then(|v| v.parse().ok())
            .unwrap_or(true)
    }

    // ========================================================================
    // Internal Helpers
    // ========================================================================

    fn flatten_config(config: &Config) -> HashMap<String, String> {
        let mut map = HashMap::new();
        map.insert(THEME_KEY.to_string(), config.theme.clone());
        map.insert(
            "restore_location".to_string(),
            config.restore_location.to_string(),
        );
        map
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    async fn test_db() -> Database {
        Database::open(":memory:").await.unwrap()
    }

    #[tokio::test]
    async fn test_load_defaults_from_config() {
        let db = test_db().await;
        let pm = PreferenceManager::load(&Config::default(), &db)
            .await
            .unwrap();

        assert_eq!(pm.theme_variant(), ThemeVariant::Light);
        assert!(pm.restore_location());
        assert_eq!(pm.location(), None);
    }

    #[tokio::test]
    async fn test_stored_theme_overrides_config() {
        let db = test_db().await;
        db.set_item(THEME_KEY, "dark").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db)
            .await
            .unwrap();
        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);
    }

    #[tokio::test]
    async fn test_invalid_stored_theme_is_light() {
        let db = test_db().await;
        let config = Config {
            theme: "dark".to_string(),
            ..Config::default()
        };
        db.set_item(THEME_KEY, "sepia").await.unwrap();

        let pm = PreferenceManager::load(&config, &db).await.unwrap();
        assert_eq!(pm.theme_variant(), ThemeVariant::Light);
    }

    #[tokio::test]
    async fn test_set_theme_persists() {
        let db = test_db().await;
        let mut pm = PreferenceManager::load(&Config::default(), &db)
            .await
            .unwrap();

        pm.set_theme(&db, ThemeVariant::Dark).await.unwrap();
        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);
        assert_eq!(
            db.get_item(THEME_KEY).await.unwrap().as_deref(),
            Some("dark")
        );

        let reloaded = PreferenceManager::load(&Config::default(), &db)
            .await
            .unwrap();
        assert_eq!(reloaded.theme_variant(), ThemeVariant::Dark);
    }

    #[tokio::test]
    async fn test_location_loaded_from_storage() {
        let db = test_db().await;
        db.set_item(LOCATION_KEY, "q=pika&sort=za").await.unwrap();

        let pm = PreferenceManager::load(&Config::default(), &db)
            .await
            .unwrap();
        assert_eq!(pm.location(), Some("q=pika&sort=za"));
    }

    #[test]
    fn test_apply_external_theme() {
        let config = Config {
            theme: "dark".to_string(),
            ..Config::default()
        };
        let mut pm = PreferenceManager::from_config(&config);
        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);

        pm.apply_external(&config, THEME_KEY, Some("light"));
        assert_eq!(pm.theme_variant(), ThemeVariant::Light);

        pm.apply_external(&config, THEME_KEY, None);
        assert_eq!(pm.theme_variant(), ThemeVariant::Dark);
    }

    #[test]
    fn test_from_config_fallback() {
        let config = Config {
            restore_location: false,
            ..Config::default()
        };
        let pm = PreferenceManager::from_config(&config);
        assert!(!pm.restore_location());
        assert_eq!(pm.theme_variant(), ThemeVariant::Light);
    }
}
