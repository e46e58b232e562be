use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use crate::ids::ItemId;

/// A title queued to watch, embedded in a user's personal queue or a group's
/// shared queue.
///
/// Items are appended and never edited in place. Equality is deep equality
/// over every field, which is what the store's union writes dedupe on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct QueueItem {
    pub id: ItemId,
    pub name: String,
    pub service: String,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub poster: Option<String>,
    #[serde(default, deserialize_with = "empty_as_none", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub added_at: Option<DateTime<Utc>>,
}

impl QueueItem {
    /// Build a new item with a fresh id, stamped with the current time
    pub fn new(name: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            id: ItemId::generate(),
            name: name.into(),
            service: service.into(),
            poster: None,
            description: None,
            added_at: Some(Utc::now()),
        }
    }

    /// Attach enrichment metadata. Empty strings are stored as absent.
    pub fn with_metadata(mut self, poster: impl Into<String>, description: impl Into<String>) -> Self {
        let poster = poster.into();
        let description = description.into();
        self.poster = Some(poster).filter(|p| !p.is_empty());
        self.description = Some(description).filter(|d| !d.is_empty());
        self
    }

    pub fn has_poster(&self) -> bool {
        self.poster.as_deref().map(|p| !p.is_empty()).unwrap_or(false)
    }
}

/// Older documents store a missing poster as `""`; treat that as absent.
pub(crate) fn empty_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<String>::deserialize(deserializer)?;
    Ok(value.filter(|s| !s.is_empty()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wire_field_names() {
        let item = QueueItem::new("Inception", "Netflix")
            .with_metadata("https://img.example/inception.jpg", "A thief who steals secrets");
        let json = serde_json::to_value(&item).unwrap();

        assert!(json.get("id").is_some());
        assert_eq!(json["name"], "Inception");
        assert_eq!(json["service"], "Netflix");
        assert_eq!(json["poster"], "https://img.example/inception.jpg");
        assert_eq!(json["description"], "A thief who steals secrets");
        assert!(json.get("addedAt").is_some());
    }

    #[test]
    fn test_empty_poster_reads_as_absent() {
        let json = r#"{"id":"1","name":"Heat","service":"Max","poster":"","description":"Cops"}"#;
        let item: QueueItem = serde_json::from_str(json).unwrap();
        assert_eq!(item.poster, None);
        assert_eq!(item.description.as_deref(), Some("Cops"));
        assert_eq!(item.added_at, None);
        assert!(!item.has_poster());
    }

    #[test]
    fn test_missing_required_field_is_rejected() {
        let json = r#"{"id":"1","service":"Max"}"#;
        assert!(serde_json::from_str::<QueueItem>(json).is_err());
    }

    #[test]
    fn test_with_metadata_drops_empty_poster() {
        let item = QueueItem::new("Obscure", "Hulu").with_metadata("", "No description available.");
        assert_eq!(item.poster, None);
        assert_eq!(item.description.as_deref(), Some("No description available."));
    }
}
