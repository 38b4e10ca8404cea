//! Current subject, injected into every set instead of read from a global.
//!
//! Authentication happens elsewhere; this module only carries its result.
//! A `Session` is a cheap clonable handle around a `watch` channel so sets
//! can react to sign-in and sign-out.

use tokio::sync::watch;

/// The authenticated user operations run on behalf of.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Subject {
    pub id: String,
}

impl Subject {
    pub fn new(id: impl Into<String>) -> Self {
        Self { id: id.into() }
    }
}

#[derive(Debug, Clone)]
pub struct Session {
    tx: watch::Sender<Option<Subject>>,
}

impl Session {
    pub fn new(subject: Option<Subject>) -> Self {
        let (tx, _rx) = watch::channel(subject);
        Self { tx }
    }

    pub fn anonymous() -> Self {
        Self::new(None)
    }

    pub fn signed_in(id: impl Into<String>) -> Self {
        Self::new(Some(Subject::new(id)))
    }

    pub fn subject(&self) -> Option<Subject> {
        self.tx.borrow().clone()
    }

    pub fn sign_in(&self, subject: Subject) {
        self.tx.send_if_modified(|current| {
            if current.as_ref() == Some(&subject) {
                return false;
            }
            *current = Some(subject);
            true
        });
    }

    pub fn sign_out(&self) {
        self.tx.send_if_modified(|current| current.take().is_some());
    }

    /// Receiver that wakes on every subject change.
    pub fn subscribe(&self) -> watch::Receiver<Option<Subject>> {
        self.tx.subscribe()
    }
}
