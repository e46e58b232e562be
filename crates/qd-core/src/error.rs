use qd_models::{GroupId, UserId};
use qd_sources::{BlobError, Collection, SourceError, StoreError};
use thiserror::Error;

/// Coarse classification callers use to decide how to present a failure
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    NotFound,
    Conflict,
    Permission,
    Transient,
}

/// Failure of a queue, group or account operation.
///
/// `Display` carries the diagnostic detail for logs; [`QueueError::user_message`]
/// is what gets shown to the person using the app.
#[derive(Debug, Error)]
pub enum QueueError {
    #[error("Invalid input: {0}")]
    Validation(String),

    #[error("No match for title '{0}'")]
    TitleNotFound(String),

    #[error("Group {0} does not exist")]
    GroupNotFound(GroupId),

    #[error("User document {0} not found")]
    UserNotFound(UserId),

    #[error("{user} is already a member of group {group}")]
    AlreadyMember { user: UserId, group: GroupId },

    #[error("Account {0} already exists")]
    AccountExists(UserId),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Could not {action}: {source}")]
    Transient {
        action: &'static str,
        #[source]
        source: Box<dyn std::error::Error + Send + Sync>,
    },
}

impl QueueError {
    pub fn validation(message: impl Into<String>) -> Self {
        QueueError::Validation(message.into())
    }

    /// Wrap a network or store failure for the operation named by `action`
    pub fn transient(action: &'static str, source: impl std::error::Error + Send + Sync + 'static) -> Self {
        QueueError::Transient {
            action,
            source: Box::new(source),
        }
    }

    /// Map a store failure, keeping the entity-specific not-found and
    /// permission cases distinct from generic unavailability
    pub fn from_store(action: &'static str, err: StoreError) -> Self {
        match err {
            StoreError::NotFound {
                collection: Collection::Users,
                id,
            } => QueueError::UserNotFound(UserId::new(id)),
            StoreError::NotFound {
                collection: Collection::Groups,
                id,
            } => QueueError::GroupNotFound(GroupId::new(id)),
            StoreError::AlreadyExists {
                collection: Collection::Users,
                id,
            } => QueueError::AccountExists(UserId::new(id)),
            StoreError::PermissionDenied(detail) => QueueError::PermissionDenied(detail),
            other => QueueError::transient(action, other),
        }
    }

    pub fn from_lookup(err: SourceError) -> Self {
        QueueError::transient("add item", err)
    }

    pub fn from_upload(err: BlobError) -> Self {
        QueueError::transient("upload poster", err)
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            QueueError::Validation(_) => ErrorKind::Validation,
            QueueError::TitleNotFound(_) | QueueError::GroupNotFound(_) | QueueError::UserNotFound(_) => {
                ErrorKind::NotFound
            }
            QueueError::AlreadyMember { .. } | QueueError::AccountExists(_) => ErrorKind::Conflict,
            QueueError::PermissionDenied(_) => ErrorKind::Permission,
            QueueError::Transient { .. } => ErrorKind::Transient,
        }
    }

    /// Message suitable for display
    pub fn user_message(&self) -> String {
        match self {
            QueueError::Validation(message) => message.clone(),
            QueueError::TitleNotFound(_) => "Title not found. Please check the name and try again.".to_string(),
            QueueError::GroupNotFound(_) => "Group does not exist. Please check the Group ID.".to_string(),
            QueueError::UserNotFound(_) => "User data not found.".to_string(),
            QueueError::AlreadyMember { .. } => "You are already a member of this group.".to_string(),
            QueueError::AccountExists(_) => "An account with this ID already exists.".to_string(),
            QueueError::PermissionDenied(_) => "You do not have permission to do that.".to_string(),
            QueueError::Transient { action, .. } => format!("Could not {}. Please try again.", action),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_not_found_maps_per_collection() {
        let user = QueueError::from_store("add item", StoreError::not_found(Collection::Users, "u1"));
        assert!(matches!(user, QueueError::UserNotFound(ref id) if id.as_str() == "u1"));
        assert_eq!(user.user_message(), "User data not found.");

        let group = QueueError::from_store("join group", StoreError::not_found(Collection::Groups, "g1"));
        assert!(matches!(group, QueueError::GroupNotFound(_)));
        assert_eq!(group.kind(), ErrorKind::NotFound);
    }

    #[test]
    fn test_permission_denied_is_its_own_kind() {
        let err = QueueError::from_store("join group", StoreError::PermissionDenied("rules".to_string()));
        assert_eq!(err.kind(), ErrorKind::Permission);
        assert_eq!(err.user_message(), "You do not have permission to do that.");
    }

    #[test]
    fn test_unavailable_store_is_transient_with_generic_message() {
        let err = QueueError::from_store("add item", StoreError::Unavailable("offline".to_string()));
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.user_message(), "Could not add item. Please try again.");
        assert!(err.to_string().contains("offline"));
    }

    #[test]
    fn test_lookup_failure_reads_as_could_not_add_item() {
        let err = QueueError::from_lookup(SourceError::Status {
            service: "OMDb",
            status: 503,
            body: String::new(),
        });
        assert_eq!(err.user_message(), "Could not add item. Please try again.");
    }

    #[test]
    fn test_conflict_messages() {
        let err = QueueError::AlreadyMember {
            user: UserId::from("u1"),
            group: GroupId::from("g1"),
        };
        assert_eq!(err.kind(), ErrorKind::Conflict);
        assert_eq!(err.user_message(), "You are already a member of this group.");
    }
}
