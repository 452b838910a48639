//! Shared application state.

use std::sync::Arc;

use crate::config::ServerConfig;
use crate::core::access::CodeStore;
use crate::core::records::AirtableStore;
use crate::core::voice::{RetellClient, VoiceBackend};
use crate::errors::AppError;

/// State shared by all handlers: the immutable configuration plus the
/// provider clients built from it.
///
/// Both clients are behind trait objects so tests can swap in fakes, and
/// behind `Option` because a deployment may legitimately lack one set of
/// credentials; the affected handler reports `SERVER_CONFIG_MISSING`.
pub struct AppState {
    pub config: ServerConfig,
    store: Option<Arc<dyn CodeStore>>,
    voice: Option<Arc<dyn VoiceBackend>>,
}

impl AppState {
    /// Build state from configuration, sharing one pooled HTTP client
    /// across both provider clients.
    pub fn new(config: ServerConfig) -> Self {
        let http = reqwest::Client::new();

        let store = config.airtable_credentials().map(|creds| {
            Arc::new(AirtableStore::new(
                http.clone(),
                creds.api_key,
                creds.base_id,
                creds.table,
            )) as Arc<dyn CodeStore>
        });

        let voice = config
            .retell_api_key()
            .map(|key| Arc::new(RetellClient::new(http.clone(), key)) as Arc<dyn VoiceBackend>);

        Self {
            config,
            store,
            voice,
        }
    }

    /// State with explicitly injected collaborators. Used by tests and any
    /// bespoke wiring that does not go through environment credentials.
    pub fn with_backends(
        config: ServerConfig,
        store: Option<Arc<dyn CodeStore>>,
        voice: Option<Arc<dyn VoiceBackend>>,
    ) -> Self {
        Self {
            config,
            store,
            voice,
        }
    }

    /// The record store, or the configuration error naming what is missing.
    pub fn store(&self) -> Result<Arc<dyn CodeStore>, AppError> {
        self.store.clone().ok_or(AppError::ConfigMissing(
            "AIRTABLE_API_KEY, AIRTABLE_BASE_ID and AIRTABLE_TABLE_ID",
        ))
    }

    /// The voice provider, or the configuration error naming what is missing.
    pub fn voice(&self) -> Result<Arc<dyn VoiceBackend>, AppError> {
        self.voice
            .clone()
            .ok_or(AppError::ConfigMissing("RETELL_API_KEY"))
    }
}
