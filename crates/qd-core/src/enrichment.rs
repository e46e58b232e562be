use crate::error::QueueError;
use qd_models::QueueItem;
use qd_sources::{LookupOutcome, TitleLookup};
use tracing::{debug, warn};

/// Trimmed name and service, or a validation error if either is blank.
/// Runs before any network call.
pub fn validate_item_input(name: &str, service: &str) -> Result<(String, String), QueueError> {
    let name = name.trim();
    let service = service.trim();
    if name.is_empty() || service.is_empty() {
        return Err(QueueError::validation("Please enter both name and service"));
    }
    Ok((name.to_string(), service.to_string()))
}

/// Look the title up and build a fresh item carrying the returned metadata.
///
/// A lookup that answers "no such title" is [`QueueError::TitleNotFound`];
/// transport and HTTP failures are transient. Nothing is retried.
pub async fn enrich_item(lookup: &dyn TitleLookup, name: &str, service: &str) -> Result<QueueItem, QueueError> {
    let (name, service) = validate_item_input(name, service)?;

    match lookup.lookup_title(&name).await {
        Ok(LookupOutcome::Found(metadata)) => {
            debug!("{} matched '{}'", lookup.service_name(), name);
            Ok(QueueItem::new(name, service).with_metadata(metadata.poster_url, metadata.description))
        }
        Ok(LookupOutcome::NotFound) => {
            warn!("{} has no title '{}'", lookup.service_name(), name);
            Err(QueueError::TitleNotFound(name))
        }
        Err(e) => {
            warn!("Metadata lookup for '{}' failed: {}", name, e);
            Err(QueueError::from_lookup(e))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeLookup;
    use crate::error::ErrorKind;

    #[test]
    fn test_blank_fields_are_rejected() {
        for (name, service) in [("", "Netflix"), ("Heat", "  "), (" ", " ")] {
            let err = validate_item_input(name, service).unwrap_err();
            assert_eq!(err.kind(), ErrorKind::Validation);
            assert_eq!(err.user_message(), "Please enter both name and service");
        }
    }

    #[tokio::test]
    async fn test_found_title_carries_metadata() {
        let lookup = FakeLookup::new().with_title("Inception", "https://img/inception.jpg", "Dreams within dreams.");
        let item = enrich_item(&lookup, "  Inception ", "Netflix").await.unwrap();

        assert_eq!(item.name, "Inception");
        assert_eq!(item.service, "Netflix");
        assert_eq!(item.poster.as_deref(), Some("https://img/inception.jpg"));
        assert_eq!(item.description.as_deref(), Some("Dreams within dreams."));
        assert!(item.added_at.is_some());
        assert!(!item.id.is_empty());
    }

    #[tokio::test]
    async fn test_unknown_title_is_not_found() {
        let lookup = FakeLookup::new();
        let err = enrich_item(&lookup, "Nope", "Hulu").await.unwrap_err();
        assert!(matches!(err, QueueError::TitleNotFound(ref t) if t == "Nope"));
    }

    #[tokio::test]
    async fn test_lookup_failure_is_transient() {
        let lookup = FakeLookup::failing();
        let err = enrich_item(&lookup, "Heat", "Max").await.unwrap_err();
        assert_eq!(err.kind(), ErrorKind::Transient);
        assert_eq!(err.user_message(), "Could not add item. Please try again.");
    }

    #[tokio::test]
    async fn test_validation_happens_before_lookup() {
        let lookup = FakeLookup::new();
        let _ = enrich_item(&lookup, "", "Max").await;
        assert_eq!(lookup.calls(), 0);
    }
}
