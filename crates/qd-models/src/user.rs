use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::ids::{GroupId, ItemId, UserId};
use crate::queue_item::QueueItem;

/// A user document (`users/<uid>`)
///
/// The id is the document key, so it is not part of the serialized body.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct User {
    #[serde(skip)]
    pub id: UserId,
    pub display_name: String,
    pub email: String,
    #[serde(default)]
    pub queue: Vec<QueueItem>,
    /// Item ids hidden from this user's views. Grows monotonically.
    #[serde(default)]
    pub watched_queue_items: Vec<ItemId>,
    #[serde(default)]
    pub groups: Vec<GroupId>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created_at: Option<DateTime<Utc>>,
}

impl User {
    /// A freshly signed-up user with every collection empty
    pub fn new(id: UserId, display_name: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            id,
            display_name: display_name.into(),
            email: email.into(),
            queue: Vec::new(),
            watched_queue_items: Vec::new(),
            groups: Vec::new(),
            created_at: Some(Utc::now()),
        }
    }

    pub fn is_member_of(&self, group_id: &GroupId) -> bool {
        self.groups.contains(group_id)
    }
}
