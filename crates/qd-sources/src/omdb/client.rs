use crate::error::SourceError;
use crate::omdb::api;
use crate::traits::{LookupOutcome, TitleLookup};
use async_trait::async_trait;
use qd_config::{CredentialStore, MetadataConfig};
use reqwest::Client;
use std::sync::Arc;
use tracing::{debug, info};

/// OMDb-backed title lookup
#[derive(Clone)]
pub struct OmdbClient {
    client: Arc<Client>,
    base_url: String,
    api_key: String,
}

pub fn create_omdb_client() -> Client {
    Client::builder()
        .user_agent(concat!("qd/", env!("CARGO_PKG_VERSION")))
        .build()
        .unwrap_or_else(|_| Client::new())
}

impl OmdbClient {
    pub fn new(base_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: Arc::new(create_omdb_client()),
            base_url: base_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Build from config, taking the API key from the credential store
    pub fn from_config(config: &MetadataConfig, credentials: &CredentialStore) -> Result<Self, SourceError> {
        let api_key = credentials
            .get_omdb_api_key()
            .filter(|k| !k.trim().is_empty())
            .ok_or_else(|| SourceError::NotConfigured("OMDb API key".to_string()))?;

        info!("Using OMDb metadata lookup at {}", config.base_url);
        Ok(Self::new(config.base_url.clone(), api_key))
    }
}

#[async_trait]
impl TitleLookup for OmdbClient {
    fn service_name(&self) -> &str {
        api::SERVICE
    }

    async fn lookup_title(&self, title: &str) -> Result<LookupOutcome, SourceError> {
        debug!("Looking up title on OMDb: {}", title);
        let response = api::fetch_title(&self.client, &self.base_url, &self.api_key, title).await?;
        Ok(response.into_outcome())
    }
}
