use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use crate::error::SourceError;

/// Poster and synopsis for a matched title
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TitleMetadata {
    /// Empty when the service has no poster
    pub poster_url: String,
    pub description: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LookupOutcome {
    Found(TitleMetadata),
    /// The service answered but has no such title
    NotFound,
}

/// Exact-title metadata lookup
#[async_trait]
pub trait TitleLookup: Send + Sync {
    fn service_name(&self) -> &str;

    /// One outbound request, no retry
    async fn lookup_title(&self, title: &str) -> Result<LookupOutcome, SourceError>;
}
