use serde::{Deserialize, Serialize};
use std::sync::Arc;

use super::{ChangeHook, StoreCell};
use crate::error::Result;
use crate::host::ConfigAccess;
use crate::model::ApiConfig;

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConfigState {
    pub api_config: Option<ApiConfig>,
    pub is_configured: bool,
    pub is_loading: bool,
}

/// The `config-storage` subset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ConfigSnapshot {
    pub api_config: Option<ApiConfig>,
    pub is_configured: bool,
}

#[derive(Clone)]
pub struct ConfigStore {
    cell: StoreCell<ConfigState>,
    host: Arc<dyn ConfigAccess>,
}

impl ConfigStore {
    pub fn new(host: Arc<dyn ConfigAccess>, hook: ChangeHook) -> Self {
        Self {
            cell: StoreCell::new(ConfigState::default(), hook),
            host,
        }
    }

    pub fn state(&self) -> ConfigState {
        self.cell.snapshot()
    }

    pub fn api_config(&self) -> Option<ApiConfig> {
        self.cell.read(|state| state.api_config.clone())
    }

    pub fn is_configured(&self) -> bool {
        self.cell.read(|state| state.is_configured)
    }

    fn finish_with(&self, api_config: Option<ApiConfig>) {
        self.cell.update(|state| {
            state.is_configured = api_config.is_some();
            state.api_config = api_config;
            state.is_loading = false;
        });
    }

    fn fail(&self) {
        self.cell.update(|state| state.is_loading = false);
    }

    pub async fn load_config(&self) -> Result<()> {
        tracing::info!("loading config");
        self.cell.update(|state| state.is_loading = true);
        match self.host.load_config().await {
            Ok(config) => {
                let configured = config.is_some();
                self.finish_with(config);
                tracing::info!(configured, "config loaded");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to load config");
                self.fail();
                Err(err)
            }
        }
    }

    pub async fn save_config(&self, config: ApiConfig) -> Result<()> {
        tracing::info!(provider = ?config.provider, "saving config");
        self.cell.update(|state| state.is_loading = true);
        match self.host.save_config(&config).await {
            Ok(()) => {
                self.finish_with(Some(config));
                tracing::info!("config saved");
                Ok(())
            }
            Err(err) => {
                tracing::error!(error = %err, "failed to save config");
                self.fail();
                Err(err)
            }
        }
    }

    /// Patches the key of the current config; without one the call only logs.
    pub async fn update_api_key(&self, api_key: &str) -> Result<()> {
        tracing::info!("updating API key");
        self.cell.update(|state| state.is_loading = true);
        if let Err(err) = self.host.update_api_key(api_key).await {
            tracing::error!(error = %err, "failed to update API key");
            self.fail();
            return Err(err);
        }

        let updated = self.cell.update(|state| {
            state.is_loading = false;
            match state.api_config.as_mut() {
                Some(config) => {
                    config.api_key = api_key.to_string();
                    true
                }
                None => false,
            }
        });
        if updated {
            tracing::info!("API key updated");
        } else {
            tracing::warn!("no config to update the API key of");
        }
        Ok(())
    }

    /// Host failures count as an invalid config.
    pub async fn validate_config(&self, config: &ApiConfig) -> bool {
        match self.host.validate_config(config).await {
            Ok(valid) => valid,
            Err(err) => {
                tracing::error!(error = %err, "failed to validate config");
                false
            }
        }
    }

    pub fn clear_config(&self) {
        tracing::info!("clearing config");
        self.cell.update(|state| {
            state.api_config = None;
            state.is_configured = false;
        });
    }

    pub fn persisted(&self) -> ConfigSnapshot {
        self.cell.read(|state| ConfigSnapshot {
            api_config: state.api_config.clone(),
            is_configured: state.is_configured,
        })
    }

    pub fn hydrate(&self, snapshot: ConfigSnapshot) {
        self.cell.update(|state| {
            state.api_config = snapshot.api_config;
            state.is_configured = snapshot.is_configured;
        });
    }
}
