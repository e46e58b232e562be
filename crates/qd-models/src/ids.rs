use serde::{Deserialize, Serialize};
use std::fmt;

/// Declares a string-backed identifier newtype.
///
/// Identifiers are serialized as bare strings so documents keep the store's
/// wire shape (`members: ["uid1", "uid2"]`, `groups: ["gid"]`, ...).
macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(String);

        impl $name {
            pub fn new(id: impl Into<String>) -> Self {
                Self(id.into())
            }

            pub fn as_str(&self) -> &str {
                &self.0
            }

            pub fn is_empty(&self) -> bool {
                self.0.trim().is_empty()
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(id: &str) -> Self {
                Self(id.to_string())
            }
        }

        impl From<String> for $name {
            fn from(id: String) -> Self {
                Self(id)
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id!(
    /// Identity issued by the external auth provider
    UserId
);

string_id!(
    /// Store-assigned group document id
    GroupId
);

string_id!(
    /// Client-generated queue item id, unique within its owning queue
    ItemId
);

impl ItemId {
    /// Generate a fresh random id.
    ///
    /// Ids are random rather than derived from the clock so that two items
    /// added with identical content in the same instant stay distinct under
    /// the store's deep-equality union writes.
    pub fn generate() -> Self {
        Self(uuid::Uuid::new_v4().to_string())
    }
}
