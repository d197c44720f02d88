//! Credential store
//!
//! The access token lives in memory with an expiry, like a browser cookie.
//! The refresh token and the password-reset flag are durable and, when a
//! storage path is configured, written to a JSON file.

use chrono::{DateTime, TimeDelta, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use crate::config::ClientConfig;
use crate::error::StorageError;

/// Default access token lifetime (20 minutes)
pub const ACCESS_TOKEN_LIFETIME: Duration = Duration::from_secs(20 * 60);

/// Durable client state
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DurableState {
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub reset_password_in_progress: bool,
}

/// JSON file backing [`DurableState`]
#[derive(Debug, Clone)]
pub struct DurableStorage {
    path: PathBuf,
}

impl DurableStorage {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Load the stored state; a missing file yields the default state
    pub fn load(&self) -> Result<DurableState, StorageError> {
        if !self.path.exists() {
            return Ok(DurableState::default());
        }
        let json = fs::read_to_string(&self.path)?;
        Ok(serde_json::from_str(&json)?)
    }

    pub fn save(&self, state: &DurableState) -> Result<(), StorageError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(state)?;
        fs::write(&self.path, json)?;
        Ok(())
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[derive(Debug, Clone)]
struct AccessToken {
    value: String,
    expires_at: DateTime<Utc>,
}

impl AccessToken {
    fn new(value: String, lifetime: Duration) -> Self {
        let now = Utc::now();
        let expires_at = TimeDelta::from_std(lifetime)
            .ok()
            .and_then(|delta| now.checked_add_signed(delta))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self { value, expires_at }
    }

    fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }
}

#[derive(Debug)]
struct Inner {
    access: RwLock<Option<AccessToken>>,
    durable: RwLock<DurableState>,
    storage: Option<DurableStorage>,
    access_lifetime: Duration,
}

/// Shared handle to the client's credentials.
///
/// Cloning is cheap; all clones see the same tokens. The authentication
/// flow is the only writer, push streams only read.
#[derive(Debug, Clone)]
pub struct CredentialStore {
    inner: Arc<Inner>,
}

impl CredentialStore {
    /// Store without durable backing
    pub fn in_memory() -> Self {
        Self::build(None, DurableState::default(), ACCESS_TOKEN_LIFETIME)
    }

    /// Store backed by a JSON file, loading what is already there
    pub fn with_storage(storage: DurableStorage) -> Result<Self, StorageError> {
        let state = storage.load()?;
        Ok(Self::build(Some(storage), state, ACCESS_TOKEN_LIFETIME))
    }

    /// Store configured from [`ClientConfig`]
    pub fn from_config(config: &ClientConfig) -> Result<Self, StorageError> {
        let (storage, state) = match &config.storage_path {
            Some(path) => {
                let storage = DurableStorage::new(path);
                let state = storage.load()?;
                (Some(storage), state)
            }
            None => (None, DurableState::default()),
        };
        Ok(Self::build(storage, state, config.access_token_lifetime))
    }

    fn build(storage: Option<DurableStorage>, state: DurableState, lifetime: Duration) -> Self {
        Self {
            inner: Arc::new(Inner {
                access: RwLock::new(None),
                durable: RwLock::new(state),
                storage,
                access_lifetime: lifetime,
            }),
        }
    }

    // ========== Access token ==========

    /// Current access token, `None` if unset or expired
    pub fn access_token(&self) -> Option<String> {
        let guard = self.inner.access.read();
        guard
            .as_ref()
            .filter(|token| !token.is_expired())
            .map(|token| token.value.clone())
    }

    /// Store an access token with the configured lifetime
    pub fn set_access_token(&self, token: impl Into<String>) {
        self.set_access_token_with_lifetime(token, self.inner.access_lifetime);
    }

    pub fn set_access_token_with_lifetime(&self, token: impl Into<String>, lifetime: Duration) {
        *self.inner.access.write() = Some(AccessToken::new(token.into(), lifetime));
    }

    pub fn delete_access_token(&self) {
        *self.inner.access.write() = None;
    }

    // ========== Durable state ==========

    pub fn refresh_token(&self) -> Option<String> {
        self.inner.durable.read().refresh_token.clone()
    }

    pub fn set_refresh_token(&self, token: impl Into<String>) -> Result<(), StorageError> {
        let token = token.into();
        self.update_durable(|state| state.refresh_token = Some(token))
    }

    pub fn delete_refresh_token(&self) -> Result<(), StorageError> {
        self.update_durable(|state| state.refresh_token = None)
    }

    /// Whether a password-reset flow was started and not yet completed
    pub fn reset_password_in_progress(&self) -> bool {
        self.inner.durable.read().reset_password_in_progress
    }

    pub fn set_reset_password_in_progress(&self, in_progress: bool) -> Result<(), StorageError> {
        self.update_durable(|state| state.reset_password_in_progress = in_progress)
    }

    /// Forget both tokens (logout)
    pub fn clear(&self) -> Result<(), StorageError> {
        self.delete_access_token();
        self.delete_refresh_token()
    }

    fn update_durable(&self, f: impl FnOnce(&mut DurableState)) -> Result<(), StorageError> {
        let mut state = self.inner.durable.write();
        f(&mut state);
        if let Some(storage) = &self.inner.storage {
            storage.save(&state)?;
        }
        Ok(())
    }
}

impl Default for CredentialStore {
    fn default() -> Self {
        Self::in_memory()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_access_token_roundtrip() {
        let store = CredentialStore::in_memory();
        assert!(store.access_token().is_none());

        store.set_access_token("Bearer abcdefghijklmnop");
        assert_eq!(store.access_token().as_deref(), Some("Bearer abcdefghijklmnop"));

        store.delete_access_token();
        assert!(store.access_token().is_none());
    }

    #[test]
    fn test_expired_access_token_is_absent() {
        let store = CredentialStore::in_memory();
        store.set_access_token_with_lifetime("token", Duration::ZERO);
        assert!(store.access_token().is_none());
    }

    #[test]
    fn test_clones_share_tokens() {
        let store = CredentialStore::in_memory();
        let reader = store.clone();
        store.set_access_token("shared-token-value");
        assert_eq!(reader.access_token().as_deref(), Some("shared-token-value"));
    }

    #[test]
    fn test_durable_state_survives_reload() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("auth").join("credentials.json");

        let store = CredentialStore::with_storage(DurableStorage::new(&path)).unwrap();
        store.set_refresh_token("refresh-1").unwrap();
        store.set_reset_password_in_progress(true).unwrap();
        store.set_access_token("not-persisted-token");

        let reloaded = CredentialStore::with_storage(DurableStorage::new(&path)).unwrap();
        assert_eq!(reloaded.refresh_token().as_deref(), Some("refresh-1"));
        assert!(reloaded.reset_password_in_progress());
        assert!(reloaded.access_token().is_none());

        reloaded.clear().unwrap();
        let cleared = DurableStorage::new(&path).load().unwrap();
        assert!(cleared.refresh_token.is_none());
        assert!(cleared.reset_password_in_progress);
    }

    #[test]
    fn test_missing_file_loads_default() {
        let temp_dir = TempDir::new().unwrap();
        let storage = DurableStorage::new(temp_dir.path().join("missing.json"));
        assert_eq!(storage.load().unwrap(), DurableState::default());
    }
}
