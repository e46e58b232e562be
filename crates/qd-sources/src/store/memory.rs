use super::{Collection, DocumentStore, DocumentWatch, StoreError, Write, WriteBatch};
use async_trait::async_trait;
use qd_models::{Group, GroupCursor, GroupId, User, UserId};
use std::collections::{BTreeMap, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, trace};

/// In-process document store with per-document live watches.
///
/// The lock is never held across an await point; every operation is a short
/// critical section, which is what makes each commit atomic.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

#[derive(Default)]
struct State {
    users: BTreeMap<UserId, User>,
    groups: BTreeMap<GroupId, Group>,
    user_watchers: HashMap<UserId, watch::Sender<Option<User>>>,
    group_watchers: HashMap<GroupId, watch::Sender<Option<Group>>>,
}

impl State {
    fn notify_user(&mut self, id: &UserId) {
        let snapshot = self.users.get(id).cloned();
        if let Some(sender) = self.user_watchers.get(id) {
            publish(sender, snapshot);
        }
    }

    fn notify_group(&mut self, id: &GroupId) {
        let snapshot = self.groups.get(id).cloned();
        if let Some(sender) = self.group_watchers.get(id) {
            publish(sender, snapshot);
        }
    }

    /// Drop senders nobody listens to any more
    fn prune_watchers(&mut self) {
        self.user_watchers.retain(|_, tx| tx.receiver_count() > 0);
        self.group_watchers.retain(|_, tx| tx.receiver_count() > 0);
    }
}

/// Push a snapshot to listeners, skipping no-op updates
fn publish<T: PartialEq>(sender: &watch::Sender<Option<T>>, snapshot: Option<T>) {
    sender.send_if_modified(|current| {
        if *current == snapshot {
            false
        } else {
            *current = snapshot;
            true
        }
    });
}

/// Append `value` unless an equal value is already present
fn union<T: PartialEq>(values: &mut Vec<T>, value: T) -> bool {
    if values.contains(&value) {
        false
    } else {
        values.push(value);
        true
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed a store from existing documents
    pub fn from_documents(users: Vec<User>, groups: Vec<Group>) -> Self {
        let store = Self::new();
        {
            let mut state = store.state();
            state.users = users.into_iter().map(|u| (u.id.clone(), u)).collect();
            state.groups = groups.into_iter().map(|g| (g.id.clone(), g)).collect();
        }
        store
    }

    /// Copy of every document, users then groups
    pub fn snapshot(&self) -> (Vec<User>, Vec<Group>) {
        let state = self.state();
        (
            state.users.values().cloned().collect(),
            state.groups.values().cloned().collect(),
        )
    }

    /// Replace all documents and notify watchers of every document that
    /// changed, appeared or disappeared. Returns the number of changed documents.
    pub fn replace_all(&self, users: Vec<User>, groups: Vec<Group>) -> usize {
        let mut state = self.state();
        let users: BTreeMap<UserId, User> = users.into_iter().map(|u| (u.id.clone(), u)).collect();
        let groups: BTreeMap<GroupId, Group> = groups.into_iter().map(|g| (g.id.clone(), g)).collect();

        let mut changed_users: Vec<UserId> = users
            .iter()
            .filter(|(id, user)| state.users.get(*id) != Some(*user))
            .map(|(id, _)| id.clone())
            .collect();
        changed_users.extend(state.users.keys().filter(|id| !users.contains_key(*id)).cloned());

        let mut changed_groups: Vec<GroupId> = groups
            .iter()
            .filter(|(id, group)| state.groups.get(*id) != Some(*group))
            .map(|(id, _)| id.clone())
            .collect();
        changed_groups.extend(state.groups.keys().filter(|id| !groups.contains_key(*id)).cloned());

        state.users = users;
        state.groups = groups;

        for id in &changed_users {
            state.notify_user(id);
        }
        for id in &changed_groups {
            state.notify_group(id);
        }

        changed_users.len() + changed_groups.len()
    }

    fn state(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Apply a batch to staged copies; nothing touches `state` unless every
    /// write succeeds.
    fn apply(state: &mut State, batch: WriteBatch) -> Result<(), StoreError> {
        let mut staged_users: BTreeMap<UserId, User> = BTreeMap::new();
        let mut staged_groups: BTreeMap<GroupId, Group> = BTreeMap::new();

        fn user_mut<'a>(
            state: &State,
            staged: &'a mut BTreeMap<UserId, User>,
            id: &UserId,
        ) -> Result<&'a mut User, StoreError> {
            if !staged.contains_key(id) {
                let user = state
                    .users
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(Collection::Users, id))?;
                staged.insert(id.clone(), user);
            }
            staged
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found(Collection::Users, id))
        }

        fn group_mut<'a>(
            state: &State,
            staged: &'a mut BTreeMap<GroupId, Group>,
            id: &GroupId,
        ) -> Result<&'a mut Group, StoreError> {
            if !staged.contains_key(id) {
                let group = state
                    .groups
                    .get(id)
                    .cloned()
                    .ok_or_else(|| StoreError::not_found(Collection::Groups, id))?;
                staged.insert(id.clone(), group);
            }
            staged
                .get_mut(id)
                .ok_or_else(|| StoreError::not_found(Collection::Groups, id))
        }

        for write in batch.into_writes() {
            trace!("Applying write: {:?}", write);
            match write {
                Write::CreateGroup(group) => {
                    if state.groups.contains_key(&group.id) || staged_groups.contains_key(&group.id) {
                        return Err(StoreError::AlreadyExists {
                            collection: Collection::Groups,
                            id: group.id.to_string(),
                        });
                    }
                    staged_groups.insert(group.id.clone(), group);
                }
                Write::UnionUserQueue { user, item } => {
                    union(&mut user_mut(state, &mut staged_users, &user)?.queue, item);
                }
                Write::UnionUserWatched { user, item } => {
                    union(&mut user_mut(state, &mut staged_users, &user)?.watched_queue_items, item);
                }
                Write::UnionUserGroups { user, group } => {
                    union(&mut user_mut(state, &mut staged_users, &user)?.groups, group);
                }
                Write::UnionGroupMembers { group, user } => {
                    union(&mut group_mut(state, &mut staged_groups, &group)?.members, user);
                }
                Write::UnionGroupQueue { group, item } => {
                    union(&mut group_mut(state, &mut staged_groups, &group)?.queue, item);
                }
            }
        }

        let user_ids: Vec<UserId> = staged_users.keys().cloned().collect();
        let group_ids: Vec<GroupId> = staged_groups.keys().cloned().collect();
        state.users.extend(staged_users);
        state.groups.extend(staged_groups);

        for id in &user_ids {
            state.notify_user(id);
        }
        for id in &group_ids {
            state.notify_group(id);
        }

        debug!(
            "Committed batch touching {} user(s) and {} group(s)",
            user_ids.len(),
            group_ids.len()
        );
        Ok(())
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn get_user(&self, id: &UserId) -> Result<Option<User>, StoreError> {
        Ok(self.state().users.get(id).cloned())
    }

    async fn get_group(&self, id: &GroupId) -> Result<Option<Group>, StoreError> {
        Ok(self.state().groups.get(id).cloned())
    }

    async fn create_user(&self, user: User) -> Result<(), StoreError> {
        let mut state = self.state();
        if state.users.contains_key(&user.id) {
            return Err(StoreError::AlreadyExists {
                collection: Collection::Users,
                id: user.id.to_string(),
            });
        }
        let id = user.id.clone();
        state.users.insert(id.clone(), user);
        state.notify_user(&id);
        Ok(())
    }

    fn allocate_group_id(&self) -> GroupId {
        GroupId::new(uuid::Uuid::new_v4().simple().to_string())
    }

    async fn commit(&self, batch: WriteBatch) -> Result<(), StoreError> {
        if batch.is_empty() {
            return Ok(());
        }
        let mut state = self.state();
        Self::apply(&mut state, batch)
    }

    async fn groups_by_created(&self, after: Option<&GroupCursor>, limit: usize) -> Result<Vec<Group>, StoreError> {
        let state = self.state();
        let mut groups: Vec<&Group> = state
            .groups
            .values()
            .filter(|g| match after {
                Some(cursor) => (g.created_at, &g.id) < (cursor.created_at, &cursor.id),
                None => true,
            })
            .collect();
        groups.sort_by(|a, b| (b.created_at, &b.id).cmp(&(a.created_at, &a.id)));
        Ok(groups.into_iter().take(limit).cloned().collect())
    }

    async fn groups_by_name(&self, limit: usize) -> Result<Vec<Group>, StoreError> {
        let state = self.state();
        let mut groups: Vec<&Group> = state.groups.values().collect();
        groups.sort_by(|a, b| (&a.name, &a.id).cmp(&(&b.name, &b.id)));
        Ok(groups.into_iter().take(limit).cloned().collect())
    }

    async fn groups_with_member(&self, user: &UserId) -> Result<Vec<Group>, StoreError> {
        Ok(self
            .state()
            .groups
            .values()
            .filter(|g| g.has_member(user))
            .cloned()
            .collect())
    }

    async fn user_ids(&self) -> Result<Vec<UserId>, StoreError> {
        Ok(self.state().users.keys().cloned().collect())
    }

    fn watch_user(&self, id: &UserId) -> DocumentWatch<User> {
        let mut state = self.state();
        state.prune_watchers();
        let current = state.users.get(id).cloned();
        let sender = state
            .user_watchers
            .entry(id.clone())
            .or_insert_with(|| watch::channel(current).0);
        DocumentWatch::new(sender.subscribe())
    }

    fn watch_group(&self, id: &GroupId) -> DocumentWatch<Group> {
        let mut state = self.state();
        state.prune_watchers();
        let current = state.groups.get(id).cloned();
        let sender = state
            .group_watchers
            .entry(id.clone())
            .or_insert_with(|| watch::channel(current).0);
        DocumentWatch::new(sender.subscribe())
    }
}
