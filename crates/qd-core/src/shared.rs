//! Shared queue synchronization
//!
//! A group's queue is one append-only array every member writes to with union
//! semantics. What each member sees is derived per viewer: the shared items
//! minus that viewer's own watched ids, filtered and sorted. Watching an item
//! never mutates the shared queue, so one member marking an item watched
//! leaves it visible to everyone else.
//!
//! [`SharedQueueSubscription`] keeps two live watches, the group document and
//! the viewer's user document, and recomputes the whole view whenever either
//! changes.

use crate::enrichment::{enrich_item, validate_item_input};
use crate::error::QueueError;
use crate::session::Session;
use crate::view::visible_queue;
use qd_models::{Group, GroupId, QueueItem, QueueView, User, UserId};
use qd_sources::{DocumentStore, DocumentWatch, TitleLookup, Write};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};


/// Lifecycle of a live view. A subscription starts out `Subscribed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubscriptionPhase {
    Subscribed,
    Updated,
    Unsubscribed,
}

pub struct SharedQueueSynchronizer {
    store: Arc<dyn DocumentStore>,
    lookup: Arc<dyn TitleLookup>,
}

impl SharedQueueSynchronizer {
    pub fn new(store: Arc<dyn DocumentStore>, lookup: Arc<dyn TitleLookup>) -> Self {
        Self { store, lookup }
    }

    /// Enrich a title and append it to the group's shared queue
    #[instrument(skip(self, session), fields(user = %session.user_id()))]
    pub async fn add_shared_item(
        &self,
        session: &Session,
        group_id: &GroupId,
        name: &str,
        service: &str,
    ) -> Result<QueueItem, QueueError> {
        validate_item_input(name, service)?;

        let exists = self
            .store
            .get_group(group_id)
            .await
            .map_err(|e| QueueError::from_store("add item", e))?
            .is_some();
        if !exists {
            return Err(QueueError::GroupNotFound(group_id.clone()));
        }

        let item = enrich_item(self.lookup.as_ref(), name, service).await?;
        self.store
            .commit(
                Write::UnionGroupQueue {
                    group: group_id.clone(),
                    item: item.clone(),
                }
                .into(),
            )
            .await
            .map_err(|e| {
                warn!("Failed to add '{}' to group {}: {}", item.name, group_id, e);
                QueueError::from_store("add item", e)
            })?;

        info!("Added '{}' ({}) to group {}", item.name, item.service, group_id);
        Ok(item)
    }

    /// One-shot read of the viewer's visible shared queue
    pub async fn list_shared(
        &self,
        session: &Session,
        group_id: &GroupId,
        view: &QueueView,
    ) -> Result<Vec<QueueItem>, QueueError> {
        let group = self
            .store
            .get_group(group_id)
            .await
            .map_err(|e| QueueError::from_store("load queue", e))?;
        let user = self
            .store
            .get_user(session.user_id())
            .await
            .map_err(|e| QueueError::from_store("load queue", e))?;

        compute(group_id, session.user_id(), group, user, view)
    }

    /// Start a live view of the group's queue for this viewer
    pub fn subscribe(&self, session: &Session, group_id: &GroupId, view: QueueView) -> SharedQueueSubscription {
        debug!("Subscribing {} to group {}", session.user_id(), group_id);
        SharedQueueSubscription {
            group_id: group_id.clone(),
            user_id: session.user_id().clone(),
            view,
            group: Some(self.store.watch_group(group_id)),
            user: Some(self.store.watch_user(session.user_id())),
            phase: SubscriptionPhase::Subscribed,
        }
    }
}

fn compute(
    group_id: &GroupId,
    user_id: &UserId,
    group: Option<Group>,
    user: Option<User>,
    view: &QueueView,
) -> Result<Vec<QueueItem>, QueueError> {
    let group = group.ok_or_else(|| QueueError::GroupNotFound(group_id.clone()))?;
    let user = user.ok_or_else(|| QueueError::UserNotFound(user_id.clone()))?;
    Ok(visible_queue(&group.queue, &user.watched_queue_items, view))
}

/// Live per-viewer view of a group's shared queue.
///
/// Dropping the subscription releases both watches.
pub struct SharedQueueSubscription {
    group_id: GroupId,
    user_id: UserId,
    view: QueueView,
    group: Option<DocumentWatch<Group>>,
    user: Option<DocumentWatch<User>>,
    phase: SubscriptionPhase,
}

impl SharedQueueSubscription {
    pub fn phase(&self) -> SubscriptionPhase {
        self.phase
    }

    /// Change sort or filter; the next [`current`](Self::current) reflects it
    pub fn set_view(&mut self, view: QueueView) {
        self.view = view;
    }

    /// Whether either document changed since the last [`next`](Self::next)
    pub fn has_pending_update(&self) -> bool {
        self.group.as_ref().is_some_and(DocumentWatch::has_changed)
            || self.user.as_ref().is_some_and(DocumentWatch::has_changed)
    }

    /// Recompute the visible queue from the latest snapshots
    pub fn current(&self) -> Result<Vec<QueueItem>, QueueError> {
        match (&self.group, &self.user) {
            (Some(group), Some(user)) => {
                compute(&self.group_id, &self.user_id, group.current(), user.current(), &self.view)
            }
            _ => Ok(Vec::new()),
        }
    }

    /// Wait for either document to change and return the recomputed view.
    ///
    /// Returns `None` after [`unsubscribe`](Self::unsubscribe) or once the
    /// store goes away.
    pub async fn next(&mut self) -> Option<Result<Vec<QueueItem>, QueueError>> {
        let (group, user) = match (self.group.as_mut(), self.user.as_mut()) {
            (Some(group), Some(user)) => (group, user),
            _ => return None,
        };

        let changed = tokio::select! {
            changed = group.changed() => changed.map(|_| ()),
            changed = user.changed() => changed.map(|_| ()),
        };

        if changed.is_none() {
            debug!("Store closed, ending subscription to group {}", self.group_id);
            self.unsubscribe();
            return None;
        }

        self.phase = SubscriptionPhase::Updated;
        Some(self.current())
    }

    /// Release both watches
    pub fn unsubscribe(&mut self) {
        self.group = None;
        self.user = None;
        self.phase = SubscriptionPhase::Unsubscribed;
    }
}
