use super::{decode_document, Collection, DocumentStore, DocumentWatch, MemoryStore, StoreError, WriteBatch};
use async_trait::async_trait;
use fs2::FileExt;
use qd_models::{Group, GroupCursor, GroupId, User, UserId};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::{debug, info, warn};

/// On-disk layout: `{ "users": { "<uid>": {...} }, "groups": { "<gid>": {...} } }`
#[derive(Debug, Default, Serialize, Deserialize)]
struct Snapshot {
    #[serde(default)]
    users: BTreeMap<String, serde_json::Value>,
    #[serde(default)]
    groups: BTreeMap<String, serde_json::Value>,
}

/// Document store persisted as a single JSON file.
///
/// Reads and watches are served from an in-memory copy. Writes take an
/// exclusive lock on `<store>.lock`, re-read the file, apply the batch to the
/// fresh documents and persist before returning, so unions from other
/// processes are never overwritten. `reload` picks up changes made by other
/// processes and wakes the affected watchers.
pub struct FileStore {
    path: PathBuf,
    memory: MemoryStore,
    write_lock: Mutex<()>,
}

impl FileStore {
    /// Open the store file, creating an empty store if it does not exist yet
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let path = path.into();
        let (users, groups) = read_documents(&path).await?;
        info!(
            "Opened store {} ({} users, {} groups)",
            path.display(),
            users.len(),
            groups.len()
        );

        Ok(Self {
            path,
            memory: MemoryStore::from_documents(users, groups),
            write_lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Re-read the file and notify watchers of changed documents.
    /// Returns how many documents changed.
    pub async fn reload(&self) -> Result<usize, StoreError> {
        let _guard = self.write_lock.lock().await;
        let (users, groups) = read_documents(&self.path).await?;
        let changed = self.memory.replace_all(users, groups);
        if changed > 0 {
            debug!("Reloaded store {}: {} document(s) changed", self.path.display(), changed);
        }
        Ok(changed)
    }

    /// Exclusive advisory lock shared by every process using this store.
    /// Released when the returned file is dropped.
    async fn lock_file(&self) -> Result<std::fs::File, StoreError> {
        let lock_path = self.path.with_extension("json.lock");
        tokio::task::spawn_blocking(move || {
            if let Some(parent) = lock_path.parent() {
                std::fs::create_dir_all(parent)?;
            }
            let file = std::fs::OpenOptions::new()
                .create(true)
                .read(true)
                .write(true)
                .open(&lock_path)?;
            file.lock_exclusive()?;
            Ok::<_, StoreError>(file)
        })
        .await
        .map_err(|e| StoreError::Unavailable(format!("store lock task failed: {}", e)))?
    }

    /// Run a write against the documents currently on disk, then persist
    async fn write_through<F, Fut>(&self, apply: F) -> Result<(), StoreError>
    where
        F: FnOnce() -> Fut,
        Fut: std::future::Future<Output = Result<(), StoreError>>,
    {
        let _guard = self.write_lock.lock().await;
        let _file_lock = self.lock_file().await?;

        let (users, groups) = read_documents(&self.path).await?;
        let changed = self.memory.replace_all(users, groups);
        if changed > 0 {
            debug!("Picked up {} external change(s) before writing", changed);
        }

        apply().await?;
        self.persist_or_rollback().await
    }

    async fn persist(&self) -> Result<(), StoreError> {
        let (users, groups) = self.memory.snapshot();
        let mut snapshot = Snapshot::default();
        for user in users {
            snapshot.users.insert(user.id.to_string(), to_value(Collection::Users, user.id.as_str(), &user)?);
        }
        for group in groups {
            snapshot
                .groups
                .insert(group.id.to_string(), to_value(Collection::Groups, group.id.as_str(), &group)?);
        }

        let content = serde_json::to_vec_pretty(&snapshot)
            .map_err(|e| StoreError::Unavailable(format!("failed to encode store: {}", e)))?;

        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        // Write then rename so readers never see a half-written file
        let tmp = self.path.with_extension("json.tmp");
        tokio::fs::write(&tmp, content).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }

    /// Persist after an in-memory mutation; on failure roll memory back to disk
    async fn persist_or_rollback(&self) -> Result<(), StoreError> {
        if let Err(e) = self.persist().await {
            warn!("Failed to persist store {}: {}. Rolling back.", self.path.display(), e);
            if let Ok((users, groups)) = read_documents(&self.path).await {
                self.memory.replace_all(users, groups);
            }
            return Err(e);
        }
        Ok(())
    }
}

fn to_value<T: Serialize>(collection: Collection, id: &str, doc: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(doc).map_err(|e| StoreError::Schema {
        collection,
        id: id.to_string(),
        reason: e.to_string(),
    })
}

async fn read_documents(path: &Path) -> Result<(Vec<User>, Vec<Group>), StoreError> {
    if !tokio::fs::try_exists(path).await? {
        debug!("Store file {} does not exist, starting empty", path.display());
        return Ok((Vec::new(), Vec::new()));
    }

    let content = tokio::fs::read_to_string(path).await?;
    if content.trim().is_empty() {
        return Ok((Vec::new(), Vec::new()));
    }

    let snapshot: Snapshot = serde_json::from_str(&content)
        .map_err(|e| StoreError::Unavailable(format!("store file {} is corrupt: {}", path.display(), e)))?;

    let mut users = Vec::with_capacity(snapshot.users.len());
    for (id, value) in snapshot.users {
        let mut user: User = decode_document(Collection::Users, &id, value)?;
        user.id = UserId::new(id);
        users.push(user);
    }

    let mut groups = Vec::with_capacity(snapshot.groups.len());
    for (id, value) in snapshot.groups {
        let mut group: Group = decode_document(Collection::Groups, &id, value)?;
        group.id = GroupId::new(id);
        groups.push(group);
    }

    Ok((users, groups))
}

#[async_trait]
impl DocumentStore for FileStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        self.memory.get_user(id).await
    }

    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        self.memory.get_group(id).await
    }

    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        self.write_through(|| self.memory.create_user(user)).await
    }

    fn allocate_group_id(&self) -> GroupId {
        self.memory.allocate_group_id()
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        self.write_through(|| self.memory.commit(batch)).await
    }

    async fn groups_by_created(&self, after: Option<&GroupCursor>, limit: usize) -> Result<Vec<Group>, StoreError> {
        self.memory.groups_by_created(after, limit).await
    }

    async fn groups_by_name(&self, limit: usize) -> Result<Vec<Group>, StoreError> {
        self.memory.groups_by_name(limit).await
    }

    async fn groups_with_member(&self, user: &UserId) -> Result<Vec<Group>, StoreError> {
        self.memory.groups_with_member(user).await
    }

    async fn user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        self.memory.user_ids().await
    }

    fn watch_user(&self, id: &UserId) -> DocumentWatch<User> {
        self.memory.watch_user(id)
    }

    fn watch_group(&self, id: &GroupId) -> DocumentWatch<Group> {
        self.memory.watch_group(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Write;
    use qd_models::QueueItem;

    #[tokio::test]
    async fn test_documents_survive_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let store = FileStore::open(&path).await.unwrap();
        store
            .create_user(User::new(UserId::from("alice"), "Alice", "alice@example.com"))
            .await
            .unwrap();
        let gid = store.allocate_group_id();
        store
            .commit(
                WriteBatch::new()
                    .with(Write::CreateGroup(Group::new(gid.clone(), "Movie Night", UserId::from("alice"), None)))
                    .with(Write::UnionUserGroups {
                        user: UserId::from("alice"),
                        group: gid.clone(),
                    }),
            )
            .await
            .unwrap();
        drop(store);

        let reopened = FileStore::open(&path).await.unwrap();
        let alice = reopened.get_user(&UserId::from("alice")).await.unwrap().unwrap();
        assert_eq!(alice.id, UserId::from("alice"));
        assert_eq!(alice.groups, vec![gid.clone()]);
        let group = reopened.get_group(&gid).await.unwrap().unwrap();
        assert_eq!(group.name, "Movie Night");
        assert_eq!(group.id, gid);
    }

    #[tokio::test]
    async fn test_wire_format_uses_store_field_names() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        let store = FileStore::open(&path).await.unwrap();
        store
            .create_user(User::new(UserId::from("alice"), "Alice", "alice@example.com"))
            .await
            .unwrap();

        let raw: serde_json::Value = serde_json::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        let alice = &raw["users"]["alice"];
        assert_eq!(alice["displayName"], "Alice");
        assert!(alice["watchedQueueItems"].is_array());
        assert!(alice["queue"].is_array());
    }

    #[tokio::test]
    async fn test_invalid_document_fails_fast() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");
        std::fs::write(
            &path,
            r#"{"users":{},"groups":{"g1":{"name":"Broken","createdAt":"2024-01-01T00:00:00Z"}}}"#,
        )
        .unwrap();

        let err = FileStore::open(&path).await.err().unwrap();
        assert!(matches!(err, StoreError::Schema { collection: Collection::Groups, .. }));
    }

    #[tokio::test]
    async fn test_reload_wakes_watchers_for_external_writes() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let writer = FileStore::open(&path).await.unwrap();
        writer
            .create_user(User::new(UserId::from("alice"), "Alice", "alice@example.com"))
            .await
            .unwrap();

        let reader = FileStore::open(&path).await.unwrap();
        let mut watch = reader.watch_user(&UserId::from("alice"));
        assert!(watch.current().unwrap().queue.is_empty());

        writer
            .commit(
                Write::UnionUserQueue {
                    user: UserId::from("alice"),
                    item: QueueItem::new("Heat", "Max"),
                }
                .into(),
            )
            .await
            .unwrap();

        assert_eq!(reader.reload().await.unwrap(), 1);
        let alice = watch.changed().await.unwrap().unwrap();
        assert_eq!(alice.queue.len(), 1);

        assert_eq!(reader.reload().await.unwrap(), 0);
    }

    #[tokio::test]
    async fn test_appends_from_two_handles_both_survive() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let alice_side = FileStore::open(&path).await.unwrap();
        let gid = alice_side.allocate_group_id();
        alice_side
            .commit(Write::CreateGroup(Group::new(gid.clone(), "Movie Night", UserId::from("alice"), None)).into())
            .await
            .unwrap();

        // opened before alice's add, so its in-memory copy is stale
        let bob_side = FileStore::open(&path).await.unwrap();

        let heat = QueueItem::new("Heat", "Max");
        let inception = QueueItem::new("Inception", "Netflix");
        let (a, b) = tokio::join!(
            alice_side.commit(Write::UnionGroupQueue { group: gid.clone(), item: heat.clone() }.into()),
            bob_side.commit(Write::UnionGroupQueue { group: gid.clone(), item: inception.clone() }.into()),
        );
        a.unwrap();
        b.unwrap();

        let reopened = FileStore::open(&path).await.unwrap();
        let queue = reopened.get_group(&gid).await.unwrap().unwrap().queue;
        assert_eq!(queue.len(), 2);
        assert!(queue.contains(&heat));
        assert!(queue.contains(&inception));
    }

    #[tokio::test]
    async fn test_create_user_sees_accounts_made_by_another_handle() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("store.json");

        let first = FileStore::open(&path).await.unwrap();
        let second = FileStore::open(&path).await.unwrap();
        first
            .create_user(User::new(UserId::from("alice"), "Alice", "alice@example.com"))
            .await
            .unwrap();

        let err = second
            .create_user(User::new(UserId::from("alice"), "Impostor", "x@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, StoreError::AlreadyExists { .. }));

        let alice = second.get_user(&UserId::from("alice")).await.unwrap().unwrap();
        assert_eq!(alice.display_name, "Alice");
    }
}
