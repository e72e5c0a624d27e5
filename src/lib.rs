pub mod config;
pub mod dto;
pub mod error;
pub mod models;
pub mod services;
pub mod utils;

use crate::config::Config;
use crate::error::Result;
use crate::services::{
    ai_service::AiService,
    integrity_service::{Camera, IntegrityEvent},
    persistence_service::{FileStorage, PersistenceService},
    session_runner::{SessionHandle, SessionRunner},
    store_service::StateStore,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;

/// Everything a host needs: the shared state store, the text generator and
/// the session clock.
#[derive(Clone)]
pub struct App {
    pub store: StateStore,
    pub ai_service: AiService,
    pub session_tick: Duration,
}

impl App {
    pub fn new(store: StateStore, ai_service: AiService, session_tick: Duration) -> Self {
        Self {
            store,
            ai_service,
            session_tick,
        }
    }

    pub fn from_config(config: &Config) -> Result<Self> {
        let storage = Arc::new(FileStorage::new(config.data_dir.clone()));
        let persistence = PersistenceService::new(storage, config.storage_key.clone());
        let store = StateStore::open(persistence);
        let ai_service = AiService::from_config(config)?;
        Ok(Self::new(store, ai_service, config.session_tick()))
    }

    /// Runs an exam for the logged-in user. The submission is written back
    /// into the store when the session ends.
    pub fn spawn_session(
        &self,
        exam_id: &str,
        integrity_events: Option<mpsc::Receiver<IntegrityEvent>>,
        camera: Option<Arc<dyn Camera>>,
    ) -> Result<SessionHandle> {
        let session = self.store.begin_session(exam_id)?;
        let mut runner = SessionRunner::new(session).tick_every(self.session_tick);
        if let Some(events) = integrity_events {
            runner = runner.with_integrity_events(events);
        }
        if let Some(camera) = camera {
            runner = runner.with_camera(camera);
        }
        Ok(runner.spawn())
    }
}
