//! User preferences kept in local storage under their own keys.

use std::sync::Arc;

use crate::error::Result;
use crate::model::{Language, Settings, ThemeMode};
use crate::storage::{self, KeyValueStorage};

#[derive(Clone)]
pub struct Preferences {
    storage: Arc<dyn KeyValueStorage>,
}

impl Preferences {
    pub fn new(storage: Arc<dyn KeyValueStorage>) -> Self {
        Self { storage }
    }

    /// Saved settings, or the defaults when none are stored or they fail to decode.
    pub fn settings(&self) -> Settings {
        match storage::load_json(self.storage.as_ref(), storage::SETTINGS) {
            Ok(Some(settings)) => settings,
            Ok(None) => Settings::default(),
            Err(err) => {
                tracing::warn!(error = %err, "stored settings unreadable, using defaults");
                Settings::default()
            }
        }
    }

    pub fn save_settings(&self, settings: &Settings) -> Result<()> {
        storage::save_json(self.storage.as_ref(), storage::SETTINGS, settings)?;
        tracing::info!(provider = ?settings.api_provider, "settings saved");
        Ok(())
    }

    pub fn theme(&self) -> Option<ThemeMode> {
        self.storage
            .get(storage::THEME)
            .and_then(|value| value.as_str().and_then(ThemeMode::parse))
    }

    pub fn set_theme(&self, theme: ThemeMode) -> Result<()> {
        self.storage.set(storage::THEME, theme.as_str().into())
    }

    pub fn language(&self) -> Option<Language> {
        self.storage
            .get(storage::LANGUAGE)
            .and_then(|value| value.as_str().and_then(Language::parse))
    }

    pub fn set_language(&self, language: Language) -> Result<()> {
        self.storage.set(storage::LANGUAGE, language.code().into())
    }

    /// Accepts both a JSON boolean and the string `"true"`.
    pub fn has_visited(&self) -> bool {
        match self.storage.get(storage::HAS_VISITED) {
            Some(serde_json::Value::Bool(visited)) => visited,
            Some(serde_json::Value::String(raw)) => raw == "true",
            _ => false,
        }
    }

    pub fn mark_visited(&self) -> Result<()> {
        self.storage.set(storage::HAS_VISITED, "true".into())
    }
}
