use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use crate::ids::{GroupId, UserId};
use crate::queue_item::{empty_as_none, QueueItem};

/// A group document (`groups/<gid>`) with its shared queue
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(skip)]
    pub id: GroupId,
    pub name: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    pub members: Vec<UserId>,
    #[serde(default)]
    pub queue: Vec<QueueItem>,
    pub created_at: DateTime<Utc>,
}

impl Group {
    /// A new group whose only member is its creator
    pub fn new(id: GroupId, name: impl Into<String>, creator: UserId, poster: Option<String>) -> Self {
        Self {
            id,
            name: name.into(),
            poster,
            members: vec![creator],
            queue: Vec::new(),
            created_at: Utc::now(),
        }
    }

    pub fn has_member(&self, user_id: &UserId) -> bool {
        self.members.contains(user_id)
    }

    pub fn summary(&self) -> GroupSummary {
        GroupSummary {
            id: self.id.clone(),
            name: self.name.clone(),
        }
    }

    /// Continuation cursor positioned at this group
    pub fn cursor(&self) -> GroupCursor {
        GroupCursor {
            created_at: self.created_at,
            id: self.id.clone(),
        }
    }
}

/// What discovery lists show for a group
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct GroupSummary {
    pub id: GroupId,
    pub name: String,
}

/// Opaque position in the `createdAt`-descending group listing.
///
/// Holds the last returned record's sort key; the id breaks ties between
/// groups created in the same instant.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GroupCursor {
    pub created_at: DateTime<Utc>,
    pub id: GroupId,
}
