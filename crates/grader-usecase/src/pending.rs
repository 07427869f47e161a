//! Pending-action queue
//!
//! Appended to by the change-feed consumer, drained by the
//! classification tick. A drain swaps the whole buffer out, so an action
//! is handed to at most one cycle.

use std::sync::{Mutex, MutexGuard, PoisonError};

use grader_domain::Action;

#[derive(Debug, Default)]
pub struct PendingQueue {
    actions: Mutex<Vec<Action>>,
}

impl PendingQueue {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Action>> {
        self.actions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn push(&self, action: Action) {
        self.lock().push(action);
    }

    pub fn extend(&self, actions: impl IntoIterator<Item = Action>) {
        self.lock().extend(actions);
    }

    /// Take everything queued so far
    pub fn drain(&self) -> Vec<Action> {
        std::mem::take(&mut *self.lock())
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }
}
