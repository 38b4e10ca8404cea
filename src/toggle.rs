//! Per-subject toggle sets mirrored from the remote store.
//!
//! Likes, reads and favorites are all the same thing: a set of identifiers
//! owned by the signed-in subject, kept in a keyed table. [`ToggleSet`]
//! implements that once; [`SetProfile`] carries what differs between the
//! instantiations (table, wording, how failures are surfaced).
//!
//! Local state only moves after the store confirms a write, so there is
//! nothing to roll back when a write fails.
//!
//! Every operation remembers the set's epoch and subject when it starts.
//! If either changed by the time the store answers (sign-out, a different
//! subject, an explicit [`ToggleSet::reset`]) the answer is dropped.

use indexmap::IndexSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use thiserror::Error;
use tokio::sync::watch;
use tokio::task::JoinHandle;

use crate::notify::{ErrorPolicy, Notification, Notifier};
use crate::session::{Session, Subject};
use crate::store::{NewRow, RemoteStore, StoreError, Table};

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ToggleError {
    #[error("Not signed in")]
    Unauthenticated,
    #[error("Remote failure: {0}")]
    RemoteFailure(String),
    /// The session changed while the request was in flight.
    #[error("Superseded by a session change")]
    Superseded,
}

impl From<StoreError> for ToggleError {
    fn from(e: StoreError) -> Self {
        ToggleError::RemoteFailure(e.to_string())
    }
}

/// What a successful call did to the local set.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ToggleOutcome {
    Added,
    Removed,
    /// Insert hit an existing row; the item is treated as a member.
    DuplicateIgnored,
    /// Nothing to do, the item was already a member.
    Unchanged,
}

impl ToggleOutcome {
    pub fn is_member(self) -> bool {
        !matches!(self, ToggleOutcome::Removed)
    }
}

/// Differences between the set instantiations.
#[derive(Debug, Clone)]
pub struct SetProfile {
    pub table: Table,
    /// Short name used in logs ("likes").
    pub label: &'static str,
    /// Human wording used in notifications ("favorites").
    pub noun: &'static str,
    pub on_error: ErrorPolicy,
    pub on_unauthenticated: ErrorPolicy,
    /// Notify the user after a confirmed add or remove.
    pub announce_changes: bool,
}

impl SetProfile {
    pub fn likes() -> Self {
        Self {
            table: Table::ArticleLikes,
            label: "likes",
            noun: "liked articles",
            on_error: ErrorPolicy::Log,
            on_unauthenticated: ErrorPolicy::Notify,
            announce_changes: false,
        }
    }

    pub fn reads() -> Self {
        Self {
            table: Table::ArticleReads,
            label: "reads",
            noun: "reading history",
            on_error: ErrorPolicy::Log,
            on_unauthenticated: ErrorPolicy::Silent,
            announce_changes: false,
        }
    }

    pub fn favorites() -> Self {
        Self {
            table: Table::Favorites,
            label: "favorites",
            noun: "favorites",
            on_error: ErrorPolicy::Notify,
            on_unauthenticated: ErrorPolicy::Notify,
            announce_changes: true,
        }
    }
}

/// Observable state of a set.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ToggleSnapshot {
    pub items: IndexSet<String>,
    /// Subject whose rows `items` mirrors, if any were loaded or written.
    pub subject: Option<Subject>,
    pub loading: bool,
    pub error: Option<String>,
}

pub struct ToggleSet {
    profile: SetProfile,
    store: Arc<dyn RemoteStore>,
    session: Session,
    notifier: Arc<dyn Notifier>,
    state: watch::Sender<ToggleSnapshot>,
    epoch: AtomicU64,
}

impl ToggleSet {
    pub fn new(
        profile: SetProfile,
        store: Arc<dyn RemoteStore>,
        session: Session,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        let (state, _rx) = watch::channel(ToggleSnapshot::default());
        Self {
            profile,
            store,
            session,
            notifier,
            state,
            epoch: AtomicU64::new(0),
        }
    }

    pub fn profile(&self) -> &SetProfile {
        &self.profile
    }

    /// Replace the local set with the subject's rows.
    ///
    /// Without a subject the set is emptied and no request is made.
    pub async fn fetch_all(&self) -> Result<(), ToggleError> {
        let Some(subject) = self.session.subject() else {
            self.state.send_modify(|s| {
                s.items.clear();
                s.subject = None;
                s.loading = false;
                s.error = None;
            });
            return Ok(());
        };

        let epoch = self.epoch.load(Ordering::SeqCst);
        self.state.send_modify(|s| s.loading = true);
        let result = self.store.select_keys(self.profile.table, &subject.id).await;
        if self.is_stale(epoch, &subject) {
            tracing::debug!(set = self.profile.label, "Dropping stale fetch result");
            self.discard_foreign();
            return Err(ToggleError::Superseded);
        }

        match result {
            Ok(keys) => {
                self.state.send_modify(|s| {
                    s.items = keys.into_iter().collect();
                    s.subject = Some(subject.clone());
                    s.loading = false;
                    s.error = None;
                });
                Ok(())
            }
            Err(e) => {
                self.state.send_modify(|s| {
                    s.loading = false;
                    s.error = Some(e.to_string());
                });
                self.report_failure(&e, None, "load");
                Err(e.into())
            }
        }
    }

    /// Re-derive the set from the store, discarding local state.
    pub async fn refetch(&self) -> Result<(), ToggleError> {
        self.fetch_all().await
    }

    pub fn is_member(&self, item: &str) -> bool {
        self.state.borrow().items.contains(item)
    }

    pub fn items(&self) -> Vec<String> {
        self.state.borrow().items.iter().cloned().collect()
    }

    pub fn snapshot(&self) -> ToggleSnapshot {
        self.state.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<ToggleSnapshot> {
        self.state.subscribe()
    }

    /// Flip membership of `item`, confirming with the store first.
    pub async fn toggle(&self, item: &str) -> Result<ToggleOutcome, ToggleError> {
        let subject = self.require_subject()?;
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.discard_foreign();

        if !self.is_member(item) {
            return self.insert(&subject, epoch, item).await;
        }

        if let Err(e) = self.store.delete(self.profile.table, &subject.id, item).await {
            self.report_failure(&e, Some(item), "update");
            return Err(e.into());
        }
        if self.is_stale(epoch, &subject) {
            tracing::debug!(set = self.profile.label, item, "Dropping stale delete result");
            self.discard_foreign();
            return Err(ToggleError::Superseded);
        }
        self.state.send_modify(|s| {
            s.items.shift_remove(item);
        });
        self.announce(ToggleOutcome::Removed, item);
        Ok(ToggleOutcome::Removed)
    }

    /// Insert-only variant: make `item` a member, never remove it.
    pub async fn add(&self, item: &str) -> Result<ToggleOutcome, ToggleError> {
        let subject = self.require_subject()?;
        self.discard_foreign();
        if self.is_member(item) {
            return Ok(ToggleOutcome::Unchanged);
        }
        let epoch = self.epoch.load(Ordering::SeqCst);
        self.insert(&subject, epoch, item).await
    }

    /// Forget local state and drop the results of in-flight requests.
    pub fn reset(&self) {
        self.epoch.fetch_add(1, Ordering::SeqCst);
        self.state.send_modify(|s| {
            s.items.clear();
            s.subject = None;
            s.loading = false;
            s.error = None;
        });
    }

    /// Keep the set in line with the session: fetch now, then reset and
    /// refetch on every subject change. Abort the handle to stop.
    pub fn sync_with_session(self: &Arc<Self>) -> JoinHandle<()> {
        let this = Arc::clone(self);
        let mut rx = this.session.subscribe();
        tokio::spawn(async move {
            rx.borrow_and_update();
            let _ = this.fetch_all().await;
            while rx.changed().await.is_ok() {
                let signed_in = rx.borrow_and_update().is_some();
                this.reset();
                if signed_in {
                    let _ = this.fetch_all().await;
                }
            }
        })
    }

    async fn insert(
        &self,
        subject: &Subject,
        epoch: u64,
        item: &str,
    ) -> Result<ToggleOutcome, ToggleError> {
        let outcome = match self
            .store
            .insert(self.profile.table, NewRow::new(subject.id.as_str(), item))
            .await
        {
            Ok(()) => ToggleOutcome::Added,
            Err(e) if e.is_conflict() => {
                tracing::debug!(set = self.profile.label, item, "Row already present, treating as member");
                ToggleOutcome::DuplicateIgnored
            }
            Err(e) => {
                self.report_failure(&e, Some(item), "update");
                return Err(e.into());
            }
        };
        if self.is_stale(epoch, subject) {
            tracing::debug!(set = self.profile.label, item, "Dropping stale insert result");
            self.discard_foreign();
            return Err(ToggleError::Superseded);
        }
        self.state.send_modify(|s| {
            s.items.insert(item.to_string());
            s.subject = Some(subject.clone());
        });
        if outcome == ToggleOutcome::Added {
            self.announce(outcome, item);
        }
        Ok(outcome)
    }

    fn require_subject(&self) -> Result<Subject, ToggleError> {
        match self.session.subject() {
            Some(subject) => Ok(subject),
            None => {
                self.report_unauthenticated();
                Err(ToggleError::Unauthenticated)
            }
        }
    }

    fn is_stale(&self, epoch: u64, subject: &Subject) -> bool {
        self.epoch.load(Ordering::SeqCst) != epoch
            || self.session.subject().as_ref() != Some(subject)
    }

    /// Empty the set if its rows belong to someone other than the current
    /// subject. Covers subject switches that happened without a `reset`.
    fn discard_foreign(&self) {
        let current = self.session.subject();
        self.state.send_if_modified(|s| {
            if s.subject == current {
                return false;
            }
            let changed = s.subject.is_some() || !s.items.is_empty() || s.loading || s.error.is_some();
            s.items.clear();
            s.subject = None;
            s.loading = false;
            s.error = None;
            changed
        });
    }

    fn announce(&self, outcome: ToggleOutcome, item: &str) {
        if !self.profile.announce_changes {
            return;
        }
        let noun = self.profile.noun;
        let n = match outcome {
            ToggleOutcome::Added => Notification::info(
                format!("Added to {noun}"),
                format!("{item} has been added to your {noun}"),
            ),
            ToggleOutcome::Removed => Notification::info(
                format!("Removed from {noun}"),
                format!("{item} has been removed from your {noun}"),
            ),
            _ => return,
        };
        self.notifier.notify(n);
    }

    fn report_unauthenticated(&self) {
        match self.profile.on_unauthenticated {
            ErrorPolicy::Notify => {
                tracing::debug!(set = self.profile.label, "Toggle without a signed-in subject");
                self.notifier.notify(Notification::error(
                    "Sign in required",
                    format!("Please sign in to update your {}", self.profile.noun),
                ));
            }
            ErrorPolicy::Log => {
                tracing::warn!(set = self.profile.label, "Toggle without a signed-in subject");
            }
            ErrorPolicy::Silent => {}
        }
    }

    fn report_failure(&self, err: &StoreError, item: Option<&str>, action: &str) {
        if self.profile.on_error == ErrorPolicy::Silent {
            return;
        }
        tracing::warn!(
            set = self.profile.label,
            item = item.unwrap_or(""),
            error = %err,
            action,
            "Remote store request failed"
        );
        if self.profile.on_error == ErrorPolicy::Notify {
            self.notifier.notify(Notification::error(
                "Error",
                format!("Failed to {action} {}", self.profile.noun),
            ));
        }
    }
}
