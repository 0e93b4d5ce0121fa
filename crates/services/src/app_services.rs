use std::sync::Arc;

use practice_core::Clock;
use storage::repository::Storage;

use crate::agent::AgentClient;
use crate::error::AppServicesError;
use crate::sessions::SessionService;

/// Assembles the service layer over a storage backend and an agent client.
///
/// Holds no process-wide mutable state beyond the storage connections; all
/// collaborators are explicit and injected.
#[derive(Clone)]
pub struct AppServices {
    storage: Storage,
    sessions: Arc<SessionService>,
}

impl AppServices {
    /// Build services backed by `SQLite` storage.
    ///
    /// # Errors
    ///
    /// Returns `AppServicesError` if storage initialization fails.
    pub async fn new_sqlite(
        db_url: &str,
        clock: Clock,
        agent: Arc<dyn AgentClient>,
    ) -> Result<Self, AppServicesError> {
        let storage = Storage::sqlite(db_url).await?;
        Ok(Self::new(storage, clock, agent))
    }

    /// Build services over in-memory storage, for tests and prototyping.
    #[must_use]
    pub fn new_in_memory(clock: Clock, agent: Arc<dyn AgentClient>) -> Self {
        Self::new(Storage::in_memory(), clock, agent)
    }

    #[must_use]
    pub fn new(storage: Storage, clock: Clock, agent: Arc<dyn AgentClient>) -> Self {
        let sessions = Arc::new(SessionService::new(clock, &storage, agent));
        Self { storage, sessions }
    }

    #[must_use]
    pub fn storage(&self) -> &Storage {
        &self.storage
    }

    #[must_use]
    pub fn sessions(&self) -> Arc<SessionService> {
        Arc::clone(&self.sessions)
    }
}
