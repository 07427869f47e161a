//! Shared handle to the one SessionContext of a running engine

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use grader_domain::SessionContext;

pub type SharedSession = Arc<Mutex<SessionContext>>;

pub fn shared(session: SessionContext) -> SharedSession {
    Arc::new(Mutex::new(session))
}

/// Lock the session. Never hold the guard across an `.await`.
pub fn lock(session: &SharedSession) -> MutexGuard<'_, SessionContext> {
    session.lock().unwrap_or_else(PoisonError::into_inner)
}
