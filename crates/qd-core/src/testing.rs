//! In-crate fakes for the external collaborators

use async_trait::async_trait;
use qd_models::{Group, GroupCursor, GroupId, User, UserId};
use qd_sources::{
    BlobError, BlobStore, DocumentStore, DocumentWatch, LookupOutcome, MailError, MemoryStore, SourceError,
    StoreError, TitleLookup, TitleMetadata, WelcomeMailer, WelcomeMessage, WriteBatch,
};
use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

pub async fn store_with_users(ids: &[&str]) -> Arc<MemoryStore> {
    let store = Arc::new(MemoryStore::new());
    for id in ids {
        store
            .create_user(User::new(UserId::from(*id), *id, format!("{}@example.com", id)))
            .await
            .unwrap();
    }
    store
}

#[derive(Default)]
pub struct FakeLookup {
    titles: HashMap<String, TitleMetadata>,
    fail: bool,
    calls: AtomicUsize,
}

impl FakeLookup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn with_title(mut self, title: &str, poster: &str, description: &str) -> Self {
        self.titles.insert(
            title.to_string(),
            TitleMetadata {
                poster_url: poster.to_string(),
                description: description.to_string(),
            },
        );
        self
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TitleLookup for FakeLookup {
    fn service_name(&self) -> &str {
        "Fake"
    }

    async fn lookup_title(&self, title: &str) -> Result<LookupOutcome, SourceError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if self.fail {
            return Err(SourceError::Status {
                service: "Fake",
                status: 503,
                body: "unavailable".to_string(),
            });
        }
        Ok(match self.titles.get(title) {
            Some(metadata) => LookupOutcome::Found(metadata.clone()),
            None => LookupOutcome::NotFound,
        })
    }
}

#[derive(Default)]
pub struct FakeBlobStore {
    uploads: Mutex<Vec<(String, String, usize)>>,
}

impl FakeBlobStore {
    /// `(key, content type, size)` per upload
    pub fn uploads(&self) -> Vec<(String, String, usize)> {
        self.uploads.lock().unwrap().clone()
    }
}

#[async_trait]
impl BlobStore for FakeBlobStore {
    async fn upload(&self, key: &str, bytes: &[u8], content_type: &str) -> Result<String, BlobError> {
        self.uploads
            .lock()
            .unwrap()
            .push((key.to_string(), content_type.to_string(), bytes.len()));
        Ok(format!("https://blobs.test/{}", key))
    }
}

#[derive(Default)]
pub struct RecordingMailer {
    sent: Mutex<Vec<WelcomeMessage>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::default()
        }
    }

    pub fn sent(&self) -> Vec<WelcomeMessage> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl WelcomeMailer for RecordingMailer {
    async fn send(&self, message: &WelcomeMessage) -> Result<(), MailError> {
        if self.fail {
            return Err(MailError::InvalidRecipient(message.to.clone()));
        }
        self.sent.lock().unwrap().push(message.clone());
        Ok(())
    }
}

/// Reads go through; every write is refused the way store security rules would
pub struct DenyingStore {
    pub inner: Arc<MemoryStore>,
}

#[async_trait]
impl DocumentStore for DenyingStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.inner.get_user(id).await
    }

    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        self.inner.get_group(id).await
    }

    async fn create_user(&self, _user: User) -> Result<(), StoreError> {
        Err(StoreError::PermissionDenied("users are read-only".to_string()))
    }

    fn allocate_group_id(&self) -> GroupId {
        self.inner.allocate_group_id()
    }

    async fn commit(&self, _batch: WriteBatch) -> Result<(), StoreError> {
        Err(StoreError::PermissionDenied("missing or insufficient permissions".to_string()))
    }

    async fn groups_by_created(&self, after: Option<&GroupCursor>, limit: usize) -> Result<Vec<Group>, StoreError> {
        self.inner.groups_by_created(after, limit).await
    }

    async fn groups_by_name(&self, limit: usize) -> Result<Vec<Group>, StoreError> {
        self.inner.groups_by_name(limit).await
    }

    async fn groups_with_member(&self, user: &UserId) -> Result<Vec<Group>, StoreError> {
        self.inner.groups_with_member(user).await
    }

    async fn user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        self.inner.user_ids().await
    }

    fn watch_user(&self, id: &UserId) -> DocumentWatch<User> {
        self.inner.watch_user(id)
    }

    fn watch_group(&self, id: &GroupId) -> DocumentWatch<Group> {
        self.inner.watch_group(id)
    }
}
