//! In-memory registry of live triage sessions.
//!
//! Each session sits behind its own mutex, so turns for one session are
//! serialized while other sessions proceed in parallel.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use thiserror::Error;
use uuid::Uuid;

use crate::pipeline::triage::TriageSession;

pub type SharedSession = Arc<Mutex<TriageSession>>;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum SessionError {
    #[error("Session not found: {0}")]
    NotFound(Uuid),

    #[error("Session registry lock poisoned")]
    LockPoisoned,
}

#[derive(Default)]
pub struct SessionRegistry {
    sessions: Mutex<HashMap<Uuid, SharedSession>>,
}

impl SessionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, HashMap<Uuid, SharedSession>>, SessionError> {
        self.sessions.lock().map_err(|_| SessionError::LockPoisoned)
    }

    /// Starts a fresh session and returns its id.
    pub fn create(&self) -> Result<Uuid, SessionError> {
        let session = TriageSession::new();
        let id = session.id();
        self.lock()?.insert(id, Arc::new(Mutex::new(session)));
        tracing::info!(session_id = %id, "Triage session created");
        Ok(id)
    }

    pub fn get(&self, id: &Uuid) -> Result<SharedSession, SessionError> {
        self.lock()?
            .get(id)
            .cloned()
            .ok_or(SessionError::NotFound(*id))
    }

    pub fn remove(&self, id: &Uuid) -> Result<SharedSession, SessionError> {
        let removed = self.lock()?.remove(id).ok_or(SessionError::NotFound(*id))?;
        tracing::info!(session_id = %id, "Triage session closed");
        Ok(removed)
    }

    /// Drops every session that has reached its terminal state.
    pub fn prune_terminal(&self) -> Result<usize, SessionError> {
        let mut sessions = self.lock()?;
        let before = sessions.len();
        sessions.retain(|_, session| {
            session
                .lock()
                .map(|s| !s.is_terminal())
                .unwrap_or(false)
        });
        Ok(before - sessions.len())
    }

    pub fn len(&self) -> usize {
        self.lock().map(|s| s.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::routing::Specialist;
    use crate::pipeline::triage::{DialogueAction, DialogueState};

    #[test]
    fn create_get_remove() {
        let registry = SessionRegistry::new();
        let id = registry.create().unwrap();
        assert_eq!(registry.len(), 1);
        assert_eq!(registry.get(&id).unwrap().lock().unwrap().id(), id);

        registry.remove(&id).unwrap();
        assert!(registry.is_empty());
        assert_eq!(registry.get(&id).unwrap_err(), SessionError::NotFound(id));
    }

    #[test]
    fn sessions_are_shared_between_handles() {
        let registry = SessionRegistry::new();
        let id = registry.create().unwrap();
        let first = registry.get(&id).unwrap();
        let second = registry.get(&id).unwrap();
        first.lock().unwrap().conversation_mut().push_assistant("Hello");
        assert_eq!(second.lock().unwrap().conversation().len(), 1);
    }

    #[test]
    fn terminal_sessions_are_pruned() {
        let registry = SessionRegistry::new();
        let open = registry.create().unwrap();
        let closed = registry.create().unwrap();
        {
            let handle = registry.get(&closed).unwrap();
            let mut session = handle.lock().unwrap();
            let counters = session.counters().clone();
            session.advance(
                DialogueState::Terminal,
                counters,
                &DialogueAction::terminal("Take care.", Specialist::GeneralPhysician),
            );
        }
        assert_eq!(registry.prune_terminal().unwrap(), 1);
        assert!(registry.get(&open).is_ok());
        assert!(registry.get(&closed).is_err());
    }
}
