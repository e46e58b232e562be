pub mod config;
pub mod credentials;
pub mod paths;

pub use config::{Config, DiscoveryConfig, MetadataConfig, NotificationConfig, QueueConfig, UploadConfig, default_allowed_content_types, default_streaming_services};
pub use credentials::CredentialStore;
pub use paths::{PathManager, base_path_override};
