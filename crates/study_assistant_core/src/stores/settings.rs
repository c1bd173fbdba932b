//! crates/study_assistant_core/src/stores/settings.rs
//!
//! Provider/model selection, per-provider credentials and the UI theme.
//! Only provider, model and theme are written to disk; API keys stay in memory
//! for the lifetime of the process.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;

use super::{Persistor, SETTINGS_RECORD};
use crate::catalog::Provider;
use crate::domain::{GatewayConfig, Theme};
use crate::ports::{PortError, PortResult, SnapshotStorage};

/// The persisted subset of the settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PersistedSettings {
    pub provider: Provider,
    pub model: String,
    pub theme: Theme,
}

impl Default for PersistedSettings {
    fn default() -> Self {
        Self {
            provider: Provider::OpenAi,
            model: Provider::OpenAi.default_model().to_string(),
            theme: Theme::System,
        }
    }
}

pub struct SettingsStore {
    persisted: PersistedSettings,
    api_keys: HashMap<Provider, String>,
    persistor: Persistor,
}

impl SettingsStore {
    /// Opens the store, loading the last saved snapshot if there is one.
    pub fn open(storage: Arc<dyn SnapshotStorage>) -> PortResult<Self> {
        let persistor = Persistor::new(storage, SETTINGS_RECORD);
        let persisted = persistor.load()?;
        Ok(Self {
            persisted,
            api_keys: HashMap::new(),
            persistor,
        })
    }

    pub fn persisted(&self) -> &PersistedSettings {
        &self.persisted
    }

    pub fn provider(&self) -> Provider {
        self.persisted.provider
    }

    /// Changes the provider without touching the model; callers pick a model
    /// valid for the new provider.
    pub fn set_provider(&mut self, provider: Provider) -> PortResult<()> {
        self.persistor.commit(&mut self.persisted, |s| {
            s.provider = provider;
            Ok(())
        })
    }

    pub fn model(&self) -> &str {
        &self.persisted.model
    }

    pub fn set_model(&mut self, model: impl Into<String>) -> PortResult<()> {
        let model = model.into();
        self.persistor.commit(&mut self.persisted, |s| {
            s.model = model;
            Ok(())
        })
    }

    pub fn theme(&self) -> Theme {
        self.persisted.theme
    }

    pub fn set_theme(&mut self, theme: Theme) -> PortResult<()> {
        self.persistor.commit(&mut self.persisted, |s| {
            s.theme = theme;
            Ok(())
        })
    }

    pub fn get_api_key(&self, provider: Provider) -> Option<&str> {
        self.api_keys.get(&provider).map(String::as_str)
    }

    /// Stores a key in memory. No snapshot is written since keys are never persisted.
    pub fn set_api_key(&mut self, provider: Provider, key: impl Into<String>) {
        self.api_keys.insert(provider, key.into());
    }

    /// Providers that currently have a usable key.
    pub fn configured_providers(&self) -> Vec<Provider> {
        Provider::ALL
            .into_iter()
            .filter(|p| self.usable_key(*p).is_some())
            .collect()
    }

    /// The key for `provider` unless it is missing or blank.
    fn usable_key(&self, provider: Provider) -> Option<&str> {
        self.get_api_key(provider).filter(|k| !k.trim().is_empty())
    }

    /// Everything a gateway needs for the active provider, or `MissingCredential`.
    pub fn gateway_config(&self) -> PortResult<GatewayConfig> {
        let provider = self.provider();
        let api_key = self
            .usable_key(provider)
            .ok_or(PortError::MissingCredential(provider))?;
        Ok(GatewayConfig {
            provider,
            model: self.persisted.model.clone(),
            api_key: api_key.to_string(),
        })
    }
}
