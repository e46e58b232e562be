use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use qd_models::SortOption;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub metadata: MetadataConfig,
    #[serde(default)]
    pub discovery: DiscoveryConfig,
    #[serde(default)]
    pub uploads: UploadConfig,
    #[serde(default)]
    pub notifications: NotificationConfig,
    #[serde(default)]
    pub queue: QueueConfig,
}

/// Title lookup service settings. The API key lives in the credential store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MetadataConfig {
    #[serde(default = "default_metadata_base_url")]
    pub base_url: String,
}

/// Group discovery (join screen) settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiscoveryConfig {
    #[serde(default = "default_page_size")]
    pub page_size: usize,
    /// Number of name-ordered groups fetched for client-side search
    #[serde(default = "default_search_window")]
    pub search_window: usize,
    #[serde(default = "default_search_debounce_ms")]
    pub search_debounce_ms: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UploadConfig {
    #[serde(default = "default_max_poster_bytes")]
    pub max_poster_bytes: u64,
    #[serde(default = "default_allowed_content_types")]
    pub allowed_content_types: Vec<String>,
}

/// Welcome notification settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NotificationConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_from_name")]
    pub from_name: String,
    #[serde(default = "default_from_address")]
    pub from_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QueueConfig {
    #[serde(default)]
    pub default_sort: SortOption,
    #[serde(default = "default_streaming_services")]
    pub services: Vec<String>,
}

fn default_true() -> bool {
    true
}

fn default_metadata_base_url() -> String {
    "https://www.omdbapi.com/".to_string()
}

fn default_page_size() -> usize {
    20
}

fn default_search_window() -> usize {
    100
}

fn default_search_debounce_ms() -> u64 {
    300
}

fn default_max_poster_bytes() -> u64 {
    5 * 1024 * 1024 // 5 MiB
}

pub fn default_allowed_content_types() -> Vec<String> {
    ["image/jpeg", "image/png", "image/gif", "image/webp"]
        .iter()
        .map(|s| s.to_string())
        .collect()
}

fn default_from_name() -> String {
    "Q'd Team".to_string()
}

fn default_from_address() -> String {
    "team@qd.local".to_string()
}

pub fn default_streaming_services() -> Vec<String> {
    qd_models::DEFAULT_STREAMING_SERVICES
        .iter()
        .map(|s| s.to_string())
        .collect()
}

impl Default for MetadataConfig {
    fn default() -> Self {
        Self {
            base_url: default_metadata_base_url(),
        }
    }
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            page_size: default_page_size(),
            search_window: default_search_window(),
            search_debounce_ms: default_search_debounce_ms(),
        }
    }
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            max_poster_bytes: default_max_poster_bytes(),
            allowed_content_types: default_allowed_content_types(),
        }
    }
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self {
            enabled: default_true(),
            from_name: default_from_name(),
            from_address: default_from_address(),
        }
    }
}

impl Default for QueueConfig {
    fn default() -> Self {
        Self {
            default_sort: SortOption::default(),
            services: default_streaming_services(),
        }
    }
}

impl Config {
    pub fn load_from_file(path: &PathBuf) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        Ok(config)
    }

    /// Load the config file if it exists, otherwise fall back to defaults
    pub fn load_or_default(path: &PathBuf) -> anyhow::Result<Self> {
        if path.exists() {
            let config = Self::load_from_file(path)?;
            config.validate()?;
            Ok(config)
        } else {
            Ok(Self::default())
        }
    }

    pub fn save_to_file(&self, path: &PathBuf) -> anyhow::Result<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = toml::to_string_pretty(self)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> anyhow::Result<()> {
        if self.metadata.base_url.trim().is_empty() {
            return Err(anyhow::anyhow!("metadata.base_url cannot be empty"));
        }

        if self.discovery.page_size == 0 {
            return Err(anyhow::anyhow!("discovery.page_size must be greater than zero"));
        }

        if self.discovery.search_window < self.discovery.page_size {
            return Err(anyhow::anyhow!(
                "discovery.search_window ({}) must be at least discovery.page_size ({})",
                self.discovery.search_window,
                self.discovery.page_size
            ));
        }

        if self.uploads.max_poster_bytes == 0 {
            return Err(anyhow::anyhow!("uploads.max_poster_bytes must be greater than zero"));
        }

        if self.uploads.allowed_content_types.is_empty() {
            return Err(anyhow::anyhow!("uploads.allowed_content_types cannot be empty"));
        }

        if let Some(bad) = self
            .uploads
            .allowed_content_types
            .iter()
            .find(|t| !t.starts_with("image/"))
        {
            return Err(anyhow::anyhow!("Invalid poster content type in allow-list: {}", bad));
        }

        if self.notifications.enabled && !self.notifications.from_address.contains('@') {
            return Err(anyhow::anyhow!(
                "notifications.from_address is not a valid address: {}",
                self.notifications.from_address
            ));
        }

        Ok(())
    }
}
