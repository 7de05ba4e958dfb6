//! Configuration store with change detection
//!
//! The widget only accepts layout, environment and endpoints at construction
//! time. The store persists every user edit, compares it against what was last
//! written, and raises a sticky `reload_needed` flag when the running widget no
//! longer matches. Acting on the flag is up to the host.

use serde::Serialize;
use std::str::FromStr;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::constants::storage_keys;
use crate::persistence::{KeyValueStorage, StorageError};

use super::environment::{resolve_preset, Environment, IframeMode};
use super::theme::ThemeMode;

#[derive(Error, Debug)]
pub enum ConfigError {
    #[error(transparent)]
    Storage(#[from] StorageError),

    /// Endpoints are derived from the preset outside of Custom
    #[error("Endpoints are read-only for the {0} environment")]
    EndpointLocked(Environment),
}

/// Everything the widget needs at construction time
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Configuration {
    pub iframe_mode: IframeMode,
    pub environment: Environment,
    pub base_url: String,
    pub base_server_url: String,
}

impl Default for Configuration {
    fn default() -> Self {
        let environment = Environment::default();
        let preset = resolve_preset(environment, ("", ""));
        Self {
            iframe_mode: IframeMode::default(),
            environment,
            base_url: preset.base_url,
            base_server_url: preset.base_server_url,
        }
    }
}

impl Configuration {
    /// Every field as storage entries, in write order
    fn storage_entries(&self) -> Vec<(&'static str, String)> {
        vec![
            (storage_keys::IFRAME_MODE, self.iframe_mode.storage_value().to_string()),
            (storage_keys::ENVIRONMENT, self.environment.storage_value().to_string()),
            (storage_keys::BASE_URL, self.base_url.clone()),
            (storage_keys::BASE_SERVER_URL, self.base_server_url.clone()),
        ]
    }
}

/// Result of running change detection
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeOutcome {
    /// Matches the persisted snapshot, nothing written
    Unchanged,
    /// Diverged; written to storage and `reload_needed` raised
    Persisted,
}

/// Owner of the effective configuration and its persisted snapshot
pub struct ConfigStore<S: KeyValueStorage> {
    storage: S,
    current: Configuration,
    theme: ThemeMode,
    reload_needed: bool,
}

impl<S: KeyValueStorage> ConfigStore<S> {
    /// Resolve configuration from storage, writing defaults for absent or
    /// malformed keys so the snapshot exists before the first edit.
    pub fn load(storage: S) -> Result<Self, ConfigError> {
        let mut store = Self {
            storage,
            current: Configuration::default(),
            theme: ThemeMode::default(),
            reload_needed: false,
        };
        store.reload()?;
        Ok(store)
    }

    /// Re-read storage after the widget was rebuilt. Clears `reload_needed`.
    pub fn reload(&mut self) -> Result<(), ConfigError> {
        let iframe_mode = read_field(&self.storage, storage_keys::IFRAME_MODE, IframeMode::default());
        let environment = read_field(&self.storage, storage_keys::ENVIRONMENT, Environment::default());
        let theme = read_field(&self.storage, storage_keys::THEME, ThemeMode::default());

        let stored_urls = (
            self.storage.get(storage_keys::BASE_URL).unwrap_or_default(),
            self.storage.get(storage_keys::BASE_SERVER_URL).unwrap_or_default(),
        );
        let preset = resolve_preset(environment, (stored_urls.0.as_str(), stored_urls.1.as_str()));

        let current = Configuration {
            iframe_mode,
            environment,
            base_url: preset.base_url,
            base_server_url: preset.base_server_url,
        };

        // Normalize the snapshot: anything absent or unparseable gets the resolved value
        let mut repairs: Vec<(&str, String)> = Vec::new();
        for (key, value) in current.storage_entries() {
            let stored = self.storage.get(key);
            let needs_write = match key {
                storage_keys::BASE_URL | storage_keys::BASE_SERVER_URL => stored.is_none(),
                _ => stored.as_deref() != Some(value.as_str()),
            };
            if needs_write {
                repairs.push((key, value));
            }
        }
        if self.storage.get(storage_keys::THEME).as_deref() != Some(theme.storage_value()) {
            repairs.push((storage_keys::THEME, theme.storage_value().to_string()));
        }

        if !repairs.is_empty() {
            let keys: Vec<&str> = repairs.iter().map(|(k, _)| *k).collect();
            info!(keys = ?keys, "Writing default settings for missing keys");
            self.storage.set_many(&repairs)?;
        }

        info!(
            mode = %current.iframe_mode,
            environment = %current.environment,
            base_url = %current.base_url,
            base_server_url = %current.base_server_url,
            "Loaded configuration"
        );

        self.current = current;
        self.theme = theme;
        self.reload_needed = false;
        Ok(())
    }

    pub fn current(&self) -> &Configuration {
        &self.current
    }

    pub fn theme(&self) -> ThemeMode {
        self.theme
    }

    /// True once persisted settings no longer match the running widget
    pub fn reload_needed(&self) -> bool {
        self.reload_needed
    }

    #[cfg(test)]
    pub fn storage(&self) -> &S {
        &self.storage
    }

    /// Compare `next` against the persisted snapshot and persist it when it differs.
    ///
    /// Mode and environment are always compared. Endpoints only count under
    /// Custom; elsewhere they are re-derived from the preset first.
    pub fn apply_change(&mut self, mut next: Configuration) -> Result<ChangeOutcome, ConfigError> {
        if !next.environment.is_custom() {
            let preset = resolve_preset(next.environment, ("", ""));
            next.base_url = preset.base_url;
            next.base_server_url = preset.base_server_url;
        }

        let drift = self.drifted_keys(&next);
        if drift.is_empty() {
            debug!("Configuration matches persisted snapshot");
            self.current = next;
            return Ok(ChangeOutcome::Unchanged);
        }

        self.storage.set_many(&next.storage_entries())?;
        self.current = next;

        if !self.reload_needed {
            info!(changed = ?drift, "Configuration diverged from running widget, restart required");
        }
        self.reload_needed = true;
        Ok(ChangeOutcome::Persisted)
    }

    /// Select an environment. Non-Custom environments take their preset
    /// endpoints before change detection; Custom keeps whatever is current.
    pub fn switch_environment(&mut self, environment: Environment) -> Result<ChangeOutcome, ConfigError> {
        let mut next = self.current.clone();
        let preset = resolve_preset(environment, (next.base_url.as_str(), next.base_server_url.as_str()));
        next.environment = environment;
        next.base_url = preset.base_url;
        next.base_server_url = preset.base_server_url;
        self.apply_change(next)
    }

    pub fn set_iframe_mode(&mut self, mode: IframeMode) -> Result<ChangeOutcome, ConfigError> {
        let mut next = self.current.clone();
        next.iframe_mode = mode;
        self.apply_change(next)
    }

    pub fn set_base_url(&mut self, url: &str) -> Result<ChangeOutcome, ConfigError> {
        self.ensure_custom()?;
        let mut next = self.current.clone();
        next.base_url = url.to_string();
        self.apply_change(next)
    }

    pub fn set_base_server_url(&mut self, url: &str) -> Result<ChangeOutcome, ConfigError> {
        self.ensure_custom()?;
        let mut next = self.current.clone();
        next.base_server_url = url.to_string();
        self.apply_change(next)
    }

    /// Persist the theme. Themes apply live, so this never raises `reload_needed`.
    pub fn set_theme(&mut self, theme: ThemeMode) -> Result<(), ConfigError> {
        if self.theme == theme {
            return Ok(());
        }
        self.storage
            .set_many(&[(storage_keys::THEME, theme.storage_value().to_string())])?;
        self.theme = theme;
        debug!(theme = %theme, "Theme persisted");
        Ok(())
    }

    fn ensure_custom(&self) -> Result<(), ConfigError> {
        if self.current.environment.is_custom() {
            Ok(())
        } else {
            warn!(environment = %self.current.environment, "Rejected endpoint edit outside Custom");
            Err(ConfigError::EndpointLocked(self.current.environment))
        }
    }

    fn drifted_keys(&self, next: &Configuration) -> Vec<&'static str> {
        let mut drift = Vec::new();

        let stored_mode = self.storage.get(storage_keys::IFRAME_MODE).and_then(|v| v.parse::<IframeMode>().ok());
        if stored_mode != Some(next.iframe_mode) {
            drift.push(storage_keys::IFRAME_MODE);
        }

        let stored_env = self.storage.get(storage_keys::ENVIRONMENT).and_then(|v| v.parse::<Environment>().ok());
        if stored_env != Some(next.environment) {
            drift.push(storage_keys::ENVIRONMENT);
        }

        if next.environment.is_custom() {
            if self.storage.get(storage_keys::BASE_URL).as_deref() != Some(next.base_url.as_str()) {
                drift.push(storage_keys::BASE_URL);
            }
            if self.storage.get(storage_keys::BASE_SERVER_URL).as_deref() != Some(next.base_server_url.as_str()) {
                drift.push(storage_keys::BASE_SERVER_URL);
            }
        }

        drift
    }
}

/// Parse one stored field, falling back to `default` when absent or malformed
fn read_field<S, T>(storage: &S, key: &str, default: T) -> T
where
    S: KeyValueStorage,
    T: FromStr<Err = String> + Copy + std::fmt::Display,
{
    match storage.get(key) {
        Some(raw) => raw.parse().unwrap_or_else(|e| {
            warn!(key, value = %raw, error = %e, fallback = %default, "Malformed stored value, using default");
            default
        }),
        None => default,
    }
}
