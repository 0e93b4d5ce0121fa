use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use practice_core::model::SessionId;

/// Per-session mutual exclusion for answer submission.
///
/// Two concurrent submissions for the same session would otherwise both
/// read the same current question, both mark it answered, and both append
/// a next question. Serializing on the session id closes that race; other
/// sessions proceed in parallel.
#[derive(Clone, Default)]
pub(crate) struct SessionLocks {
    locks: Arc<Mutex<HashMap<SessionId, Arc<tokio::sync::Mutex<()>>>>>,
}

impl SessionLocks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Handle to the lock for one session, created on first use.
    pub(crate) fn lock_for(&self, id: SessionId) -> Arc<tokio::sync::Mutex<()>> {
        let mut guard = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        Arc::clone(guard.entry(id).or_default())
    }

    /// Drop the lock entry once its session is gone.
    pub(crate) fn forget(&self, id: SessionId) {
        let mut guard = match self.locks.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        };
        guard.remove(&id);
    }
}
