//! services/api/src/web/state.rs
//!
//! Defines the application's shared state.

use crate::config::Config;
use std::sync::Arc;
use study_assistant_core::{
    ports::{AiGateway, AiGatewayFactory, PortResult, SnapshotStorage},
    stores::{ConversationStore, PlannerStore, SettingsStore, StudyCardStore},
};
use tokio::sync::Mutex;
use tracing::info;

//=========================================================================================
// AppState (Shared Across All Connections)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
///
/// Each store sits behind its own lock so one mutation is one critical section.
/// Handlers release the lock before awaiting the gateway.
pub struct AppState {
    pub config: Arc<Config>,
    pub settings: Mutex<SettingsStore>,
    pub conversations: Mutex<ConversationStore>,
    pub study_cards: Mutex<StudyCardStore>,
    pub planner: Mutex<PlannerStore>,
    pub gateways: Arc<dyn AiGatewayFactory>,
}

impl AppState {
    /// Loads every store from `storage` and seeds the API keys found in `config`.
    pub fn open(
        config: Arc<Config>,
        storage: Arc<dyn SnapshotStorage>,
        gateways: Arc<dyn AiGatewayFactory>,
    ) -> PortResult<Self> {
        let mut settings = SettingsStore::open(storage.clone())?;
        for (provider, key) in &config.api_keys {
            settings.set_api_key(*provider, key.clone());
        }
        info!(
            configured = ?settings.configured_providers(),
            "Settings loaded"
        );

        Ok(Self {
            config,
            settings: Mutex::new(settings),
            conversations: Mutex::new(ConversationStore::open(storage.clone())?),
            study_cards: Mutex::new(StudyCardStore::open(storage.clone())?),
            planner: Mutex::new(PlannerStore::open(storage)?),
            gateways,
        })
    }

    /// Opens a gateway for the active provider, or fails with `MissingCredential`.
    pub async fn gateway(&self) -> PortResult<Arc<dyn AiGateway>> {
        let config = self.settings.lock().await.gateway_config()?;
        self.gateways.connect(&config)
    }
}
