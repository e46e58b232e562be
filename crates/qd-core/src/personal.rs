use crate::enrichment::{enrich_item, validate_item_input};
use crate::error::QueueError;
use crate::session::Session;
use crate::shared::SubscriptionPhase;
use crate::view::visible_queue;
use qd_models::{GroupId, ItemId, QueueItem, QueueView, User, UserId};
use qd_sources::{DocumentStore, DocumentWatch, TitleLookup, Write};
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

/// One user's personal queue and watched set
pub struct PersonalQueueManager {
    store: Arc<dyn DocumentStore>,
    lookup: Arc<dyn TitleLookup>,
}

impl PersonalQueueManager {
    pub fn new(store: Arc<dyn DocumentStore>, lookup: Arc<dyn TitleLookup>) -> Self {
        Self { store, lookup }
    }

    #[instrument(skip(self, session), fields(user = %session.user_id()))]
    pub async fn add_item(&self, session: &Session, name: &str, service: &str) -> Result<QueueItem, QueueError> {
        validate_item_input(name, service)?;

        let exists = self
            .store
            .get_user(session.user_id())
            .await
            .map_err(|e| QueueError::from_store("add item", e))?
            .is_some();
        if !exists {
            return Err(QueueError::UserNotFound(session.user_id().clone()));
        }

        let item = enrich_item(self.lookup.as_ref(), name, service).await?;
        self.append(session, item, "add item").await
    }

    /// Append an existing item, e.g. one taken from a group queue, unchanged
    pub async fn copy_item(&self, session: &Session, item: &QueueItem) -> Result<QueueItem, QueueError> {
        self.append(session, item.clone(), "copy item").await
    }

    /// Copy an item from a group's shared queue into the personal queue
    pub async fn copy_from_group(
        &self,
        session: &Session,
        group_id: &GroupId,
        item_id: &ItemId,
    ) -> Result<QueueItem, QueueError> {
        let group = self
            .store
            .get_group(group_id)
            .await
            .map_err(|e| QueueError::from_store("copy item", e))?
            .ok_or_else(|| QueueError::GroupNotFound(group_id.clone()))?;

        let item = group
            .queue
            .iter()
            .find(|item| &item.id == item_id)
            .ok_or_else(|| QueueError::validation("That item is not in this group's queue"))?;
        self.copy_item(session, item).await
    }

    async fn append(&self, session: &Session, item: QueueItem, action: &'static str) -> Result<QueueItem, QueueError> {
        self.store
            .commit(
                Write::UnionUserQueue {
                    user: session.user_id().clone(),
                    item: item.clone(),
                }
                .into(),
            )
            .await
            .map_err(|e| {
                warn!("Failed to {} '{}' for {}: {}", action, item.name, session.user_id(), e);
                QueueError::from_store(action, e)
            })?;

        info!("Added '{}' ({}) to {}'s queue", item.name, item.service, session.user_id());
        Ok(item)
    }

    /// Record the item as watched. Idempotent; the queue itself is untouched.
    pub async fn mark_watched(&self, session: &Session, item_id: &ItemId) -> Result<(), QueueError> {
        if item_id.is_empty() {
            return Err(QueueError::validation("Please choose an item to mark as watched"));
        }

        self.store
            .commit(
                Write::UnionUserWatched {
                    user: session.user_id().clone(),
                    item: item_id.clone(),
                }
                .into(),
            )
            .await
            .map_err(|e| QueueError::from_store("mark item watched", e))?;

        debug!("{} watched {}", session.user_id(), item_id);
        Ok(())
    }

    pub async fn list_visible(&self, session: &Session, view: &QueueView) -> Result<Vec<QueueItem>, QueueError> {
        let user = self
            .store
            .get_user(session.user_id())
            .await
            .map_err(|e| QueueError::from_store("load queue", e))?
            .ok_or_else(|| QueueError::UserNotFound(session.user_id().clone()))?;

        Ok(visible_queue(&user.queue, &user.watched_queue_items, view))
    }

    /// Live view of the personal queue
    pub fn subscribe(&self, session: &Session, view: QueueView) -> PersonalQueueSubscription {
        PersonalQueueSubscription {
            user_id: session.user_id().clone(),
            view,
            user: Some(self.store.watch_user(session.user_id())),
            phase: SubscriptionPhase::Subscribed,
        }
    }
}

pub struct PersonalQueueSubscription {
    user_id: UserId,
    view: QueueView,
    user: Option<DocumentWatch<User>>,
    phase: SubscriptionPhase,
}

impl PersonalQueueSubscription {
    pub fn phase(&self) -> SubscriptionPhase {
        self.phase
    }

    pub fn set_view(&mut self, view: QueueView) {
        self.view = view;
    }

    pub fn current(&self) -> Result<Vec<QueueItem>, QueueError> {
        let Some(watch) = &self.user else {
            return Ok(Vec::new());
        };
        let user = watch
            .current()
            .ok_or_else(|| QueueError::UserNotFound(self.user_id.clone()))?;
        Ok(visible_queue(&user.queue, &user.watched_queue_items, &self.view))
    }

    pub async fn next(&mut self) -> Option<Result<Vec<QueueItem>, QueueError>> {
        let watch = self.user.as_mut()?;
        if watch.changed().await.is_none() {
            self.unsubscribe();
            return None;
        }
        self.phase = SubscriptionPhase::Updated;
        Some(self.current())
    }

    pub fn unsubscribe(&mut self) {
        self.user = None;
        self.phase = SubscriptionPhase::Unsubscribed;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;
    use crate::testing::{store_with_users, DenyingStore, FakeLookup};
    use qd_models::{Group, SortOption};

    fn manager(store: Arc<dyn DocumentStore>) -> PersonalQueueManager {
        let lookup = FakeLookup::new()
            .with_title("Inception", "https://img/inception.jpg", "Dreams.")
            .with_title("Heat", "", "No description available.");
        PersonalQueueManager::new(store, Arc::new(lookup))
    }

    #[tokio::test]
    async fn test_add_then_list_contains_exactly_one_enriched_item() {
        let store = store_with_users(&["alice"]).await;
        let queue = manager(store.clone());
        let alice = Session::new("alice");

        let added = queue.add_item(&alice, "Inception", "Netflix").await.unwrap();
        let visible = queue.list_visible(&alice, &QueueView::default()).await.unwrap();

        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].id, added.id);
        assert_eq!(visible[0].poster.as_deref(), Some("https://img/inception.jpg"));
        assert_eq!(visible[0].description.as_deref(), Some("Dreams."));
    }

    #[tokio::test]
    async fn test_empty_poster_is_stored_as_absent() {
        let store = store_with_users(&["alice"]).await;
        let queue = manager(store);
        let item = queue.add_item(&Session::new("alice"), "Heat", "Max").await.unwrap();
        assert!(item.poster.is_none());
        assert!(!item.has_poster());
    }

    #[tokio::test]
    async fn test_title_not_found_writes_nothing() {
        let store = store_with_users(&["alice"]).await;
        let queue = manager(store.clone());
        let alice = Session::new("alice");

        let err = queue.add_item(&alice, "Unknown Film", "Hulu").await.unwrap_err();
        assert_eq!(err.user_message(), "Title not found. Please check the name and try again.");

        let user = store.get_user(&UserId::from("alice")).await.unwrap().unwrap();
        assert!(user.queue.is_empty());
    }

    #[tokio::test]
    async fn test_mark_watched_is_idempotent_and_hides_item() {
        let store = store_with_users(&["alice"]).await;
        let queue = manager(store.clone());
        let alice = Session::new("alice");

        let item = queue.add_item(&alice, "Inception", "Netflix").await.unwrap();
        queue.mark_watched(&alice, &item.id).await.unwrap();
        queue.mark_watched(&alice, &item.id).await.unwrap();

        let user = store.get_user(&UserId::from("alice")).await.unwrap().unwrap();
        assert_eq!(user.watched_queue_items, vec![item.id.clone()]);
        assert_eq!(user.queue.len(), 1);

        for sort in [SortOption::DateAsc, SortOption::DateDesc, SortOption::ServiceAsc, SortOption::ServiceDesc] {
            let visible = queue.list_visible(&alice, &QueueView::sorted_by(sort)).await.unwrap();
            assert!(visible.is_empty());
        }
    }

    #[tokio::test]
    async fn test_missing_user_is_reported() {
        let store = store_with_users(&[]).await;
        let queue = manager(store);
        let ghost = Session::new("ghost");

        let err = queue.list_visible(&ghost, &QueueView::default()).await.unwrap_err();
        assert_eq!(err.user_message(), "User data not found.");

        let err = queue.add_item(&ghost, "Inception", "Netflix").await.unwrap_err();
        assert!(matches!(err, QueueError::UserNotFound(_)));
    }

    #[tokio::test]
    async fn test_missing_user_is_rejected_before_lookup() {
        let lookup = Arc::new(FakeLookup::new().with_title("Inception", "https://img/inception.jpg", "Dreams."));
        let queue = PersonalQueueManager::new(store_with_users(&[]).await, lookup.clone());

        let err = queue.add_item(&Session::new("ghost"), "Inception", "Netflix").await.unwrap_err();
        assert!(matches!(err, QueueError::UserNotFound(_)));
        assert_eq!(lookup.calls(), 0);
    }

    #[tokio::test]
    async fn test_copy_from_group_keeps_item_identity() {
        let store = store_with_users(&["alice"]).await;
        let shared = QueueItem::new("Dune", "Max");
        let mut group = Group::new(GroupId::from("g1"), "Sci-fi", UserId::from("alice"), None);
        group.queue.push(shared.clone());
        store.commit(Write::CreateGroup(group).into()).await.unwrap();

        let queue = manager(store.clone());
        let alice = Session::new("alice");
        let copied = queue.copy_from_group(&alice, &GroupId::from("g1"), &shared.id).await.unwrap();
        assert_eq!(copied, shared);

        // copying twice collapses under union semantics
        queue.copy_item(&alice, &shared).await.unwrap();
        let user = store.get_user(&UserId::from("alice")).await.unwrap().unwrap();
        assert_eq!(user.queue, vec![shared]);

        let err = queue
            .copy_from_group(&alice, &GroupId::from("g1"), &ItemId::from("missing"))
            .await
            .unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Validation);
    }

    #[tokio::test]
    async fn test_permission_denied_surfaces_distinctly() {
        let inner = store_with_users(&["alice"]).await;
        let queue = manager(Arc::new(DenyingStore { inner }));

        let err = queue.add_item(&Session::new("alice"), "Inception", "Netflix").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Permission);
    }

    #[tokio::test]
    async fn test_subscription_recomputes_on_push() {
        let store = store_with_users(&["alice"]).await;
        let queue = manager(store.clone());
        let alice = Session::new("alice");

        let mut live = queue.subscribe(&alice, QueueView::default());
        assert_eq!(live.phase(), SubscriptionPhase::Subscribed);
        assert!(live.current().unwrap().is_empty());

        let item = queue.add_item(&alice, "Inception", "Netflix").await.unwrap();
        let visible = live.next().await.unwrap().unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(live.phase(), SubscriptionPhase::Updated);

        queue.mark_watched(&alice, &item.id).await.unwrap();
        assert!(live.next().await.unwrap().unwrap().is_empty());

        live.unsubscribe();
        assert_eq!(live.phase(), SubscriptionPhase::Unsubscribed);
        assert!(live.next().await.is_none());
    }
    #[tokio::test]
    async fn test_watched_items_stay_hidden_after_reopening_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let alice = Session::new("alice");

        let store = Arc::new(qd_sources::FileStore::open(&path).await.unwrap());
        store
            .create_user(qd_models::User::new(alice.user_id().clone(), "Alice", "alice@example.com"))
            .await
            .unwrap();
        let queue = manager(store);
        let inception = queue.add_item(&alice, "Inception", "Netflix").await.unwrap();
        queue.add_item(&alice, "Heat", "Hulu").await.unwrap();
        queue.mark_watched(&alice, &inception.id).await.unwrap();

        let reopened = manager(Arc::new(qd_sources::FileStore::open(&path).await.unwrap()));
        let visible = reopened.list_visible(&alice, &QueueView::default()).await.unwrap();
        assert_eq!(visible.len(), 1);
        assert_eq!(visible[0].name, "Heat");
    }
}
