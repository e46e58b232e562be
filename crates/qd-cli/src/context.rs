use color_eyre::eyre::{eyre, Report};
use color_eyre::Result;
use qd_config::{Config, CredentialStore, PathManager};
use qd_core::{QueueError, Session};
use async_trait::async_trait;
use qd_sources::{
    FileStore, LocalBlobStore, LogMailer, LookupOutcome, OmdbClient, OutboxMailer, SourceError, TitleLookup,
    WelcomeMailer,
};
use std::sync::Arc;
use tracing::debug;

/// Everything a command needs: paths, settings, credentials and the store
pub struct AppContext {
    pub paths: PathManager,
    pub config: Config,
    pub credentials: CredentialStore,
    pub store: Arc<FileStore>,
    acting_as: Option<String>,
}

impl AppContext {
    pub async fn load(acting_as: Option<String>) -> Result<Self> {
        let paths = PathManager::default();
        paths
            .ensure_directories()
            .map_err(|e| eyre!("Failed to create {}: {}", paths.config_dir().display(), e))?;

        let config_file = paths.config_file();
        let config = Config::load_or_default(&config_file)
            .map_err(|e| eyre!("Invalid configuration in {}: {}", config_file.display(), e))?;

        let mut credentials = CredentialStore::new(paths.credentials_file());
        credentials
            .load()
            .map_err(|e| eyre!("Failed to load credentials: {}", e))?;

        let store = FileStore::open(paths.store_file())
            .await
            .map_err(|e| eyre!("Failed to open store: {}", e))?;
        debug!("Using store at {}", store.path().display());

        Ok(Self {
            paths,
            config,
            credentials,
            store: Arc::new(store),
            acting_as,
        })
    }

    /// The user commands act for: `--as` first, then the saved session
    pub fn session(&self) -> Result<Session> {
        self.acting_as
            .clone()
            .or_else(|| self.credentials.get_session_user_id().cloned())
            .filter(|id| !id.trim().is_empty())
            .map(Session::new)
            .ok_or_else(|| eyre!("No active account. Run 'qd account create' or 'qd account use <id>', or pass --as <id>."))
    }

    pub fn lookup(&self) -> Result<Arc<dyn TitleLookup>> {
        let client = OmdbClient::from_config(&self.config.metadata, &self.credentials)
            .map_err(|e| eyre!("{}. Run 'qd config set-api-key <key>' or set QD_OMDB_API_KEY.", e))?;
        Ok(Arc::new(client))
    }

    /// For commands that never enrich titles: works without an API key
    pub fn lookup_or_offline(&self) -> Arc<dyn TitleLookup> {
        match OmdbClient::from_config(&self.config.metadata, &self.credentials) {
            Ok(client) => Arc::new(client),
            Err(_) => Arc::new(OfflineLookup),
        }
    }

    pub fn blobs(&self) -> Arc<LocalBlobStore> {
        Arc::new(LocalBlobStore::new(self.paths.blob_dir()))
    }

    pub fn mailer(&self) -> Arc<dyn WelcomeMailer> {
        if self.config.notifications.enabled {
            Arc::new(OutboxMailer::new(self.paths.outbox_dir()))
        } else {
            Arc::new(LogMailer)
        }
    }
}

struct OfflineLookup;

#[async_trait]
impl TitleLookup for OfflineLookup {
    fn service_name(&self) -> &str {
        "offline"
    }

    async fn lookup_title(&self, _title: &str) -> Result<LookupOutcome, SourceError> {
        Err(SourceError::NotConfigured("OMDb API key".to_string()))
    }
}

/// Lead with the message meant for people, keep the diagnostic as the cause
pub fn user_facing(err: QueueError) -> Report {
    let message = err.user_message();
    Report::new(err).wrap_err(message)
}
