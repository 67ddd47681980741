//! JT808 Console Library
//!
//! Authenticated client core for the JT808 vehicle telemetry backend.

pub mod api;
pub mod auth;
pub mod client;
pub mod commands;
pub mod config;
pub mod events;
pub mod format;
pub mod geo;
pub mod logging;
pub mod storage;

use std::sync::Arc;

use tracing::info;

use auth::{RestoreOutcome, SessionStore};
use client::{ApiClient, ApiError};
use config::ClientConfig;
use events::EventBus;
use storage::{FileStorage, KeyValueStore};

/// Application state shared by every command
pub struct AppState {
    pub config: ClientConfig,
    pub session: Arc<SessionStore>,
    pub events: EventBus,
    pub api: ApiClient,
}

impl AppState {
    /// Open the on-disk session storage and restore any saved session
    pub fn init(config: ClientConfig) -> anyhow::Result<Self> {
        let storage = FileStorage::open(&config.data_dir)?;
        let state = Self::with_storage(config, Arc::new(storage))?;

        match state.session.restore() {
            RestoreOutcome::Restored => info!("Resumed session for {}", state.session.display_name()),
            RestoreOutcome::Empty => info!("No saved session"),
            RestoreOutcome::Healed => info!("Discarded an incomplete saved session"),
        }

        Ok(state)
    }

    /// Build state over any storage backend; the session starts logged out
    pub fn with_storage(config: ClientConfig, storage: Arc<dyn KeyValueStore>) -> Result<Self, ApiError> {
        let session = Arc::new(SessionStore::new(storage));
        let events = EventBus::new();
        let api = ApiClient::new(&config, session.clone(), events.clone())?;

        Ok(Self {
            config,
            session,
            events,
            api,
        })
    }
}
