use anyhow::{Context, Result};
use std::collections::BTreeMap;
use std::path::PathBuf;

const OMDB_API_KEY: &str = "omdb_api_key";
const OMDB_API_KEY_ENV: &str = "QD_OMDB_API_KEY";
const SESSION_USER_ID: &str = "session_user_id";

/// Flat `key = "value"` TOML file holding secrets and the active session.
/// Kept apart from `config.toml` so the config can be shared safely.
pub struct CredentialStore {
    path: PathBuf,
    entries: BTreeMap<String, String>,
}

impl CredentialStore {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            entries: BTreeMap::new(),
        }
    }

    /// A missing file is an empty store
    pub fn load(&mut self) -> Result<()> {
        if !self.path.exists() {
            return Ok(());
        }
        let content = std::fs::read_to_string(&self.path)
            .with_context(|| format!("reading {}", self.path.display()))?;
        self.entries = toml::from_str(&content)
            .with_context(|| format!("parsing {}", self.path.display()))?;
        Ok(())
    }

    pub fn save(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&self.path, toml::to_string(&self.entries)?)
            .with_context(|| format!("writing {}", self.path.display()))?;
        Ok(())
    }

    pub fn get(&self, key: &str) -> Option<&String> {
        self.entries.get(key)
    }

    pub fn set(&mut self, key: impl Into<String>, value: String) {
        self.entries.insert(key.into(), value);
    }

    /// OMDb API key; the `QD_OMDB_API_KEY` environment variable wins over the file
    pub fn get_omdb_api_key(&self) -> Option<String> {
        std::env::var(OMDB_API_KEY_ENV)
            .ok()
            .filter(|k| !k.trim().is_empty())
            .or_else(|| self.get(OMDB_API_KEY).cloned())
    }

    pub fn set_omdb_api_key(&mut self, key: String) {
        self.set(OMDB_API_KEY, key);
    }

    /// The user the CLI acts as between invocations
    pub fn get_session_user_id(&self) -> Option<&String> {
        self.get(SESSION_USER_ID)
    }

    pub fn set_session_user_id(&mut self, user_id: String) {
        self.set(SESSION_USER_ID, user_id);
    }

    pub fn clear_session(&mut self) {
        self.entries.remove(SESSION_USER_ID);
    }
}
