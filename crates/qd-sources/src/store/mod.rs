//! Document store collaborator
//!
//! The store owns persistence and live updates for two collections, `users`
//! and `groups`. Every mutation goes through [`DocumentStore::commit`], which
//! applies a [`WriteBatch`] atomically across documents, so paired writes such
//! as a join's `members`/`groups` update never leave one side behind.

pub mod file;
pub mod memory;

pub use file::FileStore;
pub use memory::MemoryStore;

use async_trait::async_trait;
use qd_models::{Group, GroupCursor, GroupId, ItemId, QueueItem, User, UserId};
use serde::de::DeserializeOwned;
use std::fmt;
use thiserror::Error;
use tokio::sync::watch;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    Users,
    Groups,
}

impl fmt::Display for Collection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Collection::Users => f.write_str("users"),
            Collection::Groups => f.write_str("groups"),
        }
    }
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("{collection}/{id} does not exist")]
    NotFound { collection: Collection, id: String },

    #[error("{collection}/{id} already exists")]
    AlreadyExists { collection: Collection, id: String },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Document {collection}/{id} failed validation: {reason}")]
    Schema {
        collection: Collection,
        id: String,
        reason: String,
    },

    #[error("Store unavailable: {0}")]
    Unavailable(String),

    #[error("Store I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl StoreError {
    pub fn not_found(collection: Collection, id: impl fmt::Display) -> Self {
        StoreError::NotFound {
            collection,
            id: id.to_string(),
        }
    }
}

/// A single typed mutation.
///
/// Union writes append the value only if no deep-equal value is already
/// present, evaluated against the document's current state at commit time.
/// They fail with [`StoreError::NotFound`] when the target document is absent.
#[derive(Debug, Clone, PartialEq)]
pub enum Write {
    CreateGroup(Group),
    UnionUserQueue { user: UserId, item: QueueItem },
    UnionUserWatched { user: UserId, item: ItemId },
    UnionUserGroups { user: UserId, group: GroupId },
    UnionGroupMembers { group: GroupId, user: UserId },
    UnionGroupQueue { group: GroupId, item: QueueItem },
}

impl Write {
    pub fn collection(&self) -> Collection {
        match self {
            Write::UnionUserQueue { .. } | Write::UnionUserWatched { .. } | Write::UnionUserGroups { .. } => {
                Collection::Users
            }
            Write::CreateGroup(_) | Write::UnionGroupMembers { .. } | Write::UnionGroupQueue { .. } => {
                Collection::Groups
            }
        }
    }
}

/// Writes applied together: all of them or none
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WriteBatch {
    writes: Vec<Write>,
}

impl WriteBatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, write: Write) -> Self {
        self.writes.push(write);
        self
    }

    pub fn push(&mut self, write: Write) {
        self.writes.push(write);
    }

    pub fn is_empty(&self) -> bool {
        self.writes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.writes.len()
    }

    pub fn writes(&self) -> &[Write] {
        &self.writes
    }

    pub fn into_writes(self) -> Vec<Write> {
        self.writes
    }
}

impl From<Write> for WriteBatch {
    fn from(write: Write) -> Self {
        WriteBatch::new().with(write)
    }
}

/// Live view of one document.
///
/// Holds the latest snapshot (`None` while the document does not exist).
/// Dropping the watch releases the listener.
pub struct DocumentWatch<T> {
    rx: watch::Receiver<Option<T>>,
}

impl<T: Clone> DocumentWatch<T> {
    pub fn new(rx: watch::Receiver<Option<T>>) -> Self {
        Self { rx }
    }

    /// Latest snapshot without waiting
    pub fn current(&self) -> Option<T> {
        self.rx.borrow().clone()
    }

    /// Wait for the next change and return the new snapshot.
    ///
    /// Returns `None` once the store has shut down.
    pub async fn changed(&mut self) -> Option<Option<T>> {
        self.rx.changed().await.ok()?;
        Some(self.rx.borrow_and_update().clone())
    }

    pub fn has_changed(&self) -> bool {
        self.rx.has_changed().unwrap_or(false)
    }
}

/// Decode a raw document body, failing fast on missing or mistyped fields
pub fn decode_document<T: DeserializeOwned>(
    collection: Collection,
    id: &str,
    value: serde_json::Value,
) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(|e| StoreError::Schema {
        collection,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError>;

    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError>;

    /// Create a user document; fails if one already exists for the id
    async fn create_user(&self, user: User) -> Result<(), StoreError>;

    /// Reserve an id for a group about to be created
    fn allocate_group_id(&self) -> GroupId;

    /// Apply every write in the batch atomically
    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError>;

    /// Groups ordered by `createdAt` descending (ties by id descending),
    /// starting strictly after `after`
    async fn groups_by_created(&self, after: Option<&GroupCursor>, limit: usize) -> Result<Vec<Group>, StoreError>;

    /// Groups ordered by name ascending (ties by id)
    async fn groups_by_name(&self, limit: usize) -> Result<Vec<Group>, StoreError>;

    /// Groups whose `members` contains the user
    async fn groups_with_member(&self, user: &UserId) -> Result<Vec<Group>, StoreError>;

    async fn user_ids(&self) -> Result<Vec<UserId>, StoreError>;

    fn watch_user(&self, id: &UserId) -> DocumentWatch<User>;

    fn watch_group(&self, id: &GroupId) -> DocumentWatch<Group>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_builder_keeps_order() {
        let batch = WriteBatch::new()
            .with(Write::UnionGroupMembers {
                group: GroupId::from("g1"),
                user: UserId::from("u1"),
            })
            .with(Write::UnionUserGroups {
                user: UserId::from("u1"),
                group: GroupId::from("g1"),
            });

        assert_eq!(batch.len(), 2);
        assert_eq!(batch.writes()[0].collection(), Collection::Groups);
        assert_eq!(batch.writes()[1].collection(), Collection::Users);
    }

    #[test]
    fn test_decode_document_reports_schema_error() {
        let value = serde_json::json!({ "name": "No members", "createdAt": "2024-01-01T00:00:00Z" });
        let err = decode_document::<Group>(Collection::Groups, "g1", value).unwrap_err();
        match err {
            StoreError::Schema { collection, id, reason } => {
                assert_eq!(collection, Collection::Groups);
                assert_eq!(id, "g1");
                assert!(reason.contains("members"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }
}
