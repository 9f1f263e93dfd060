//! Client-side persisted key/value state
//!
//! Keys mirror what the web dashboard keeps in local storage so both can read
//! the same document.

use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use super::SessionError;

/// Well-known storage keys
pub mod keys {
    pub const TOKEN: &str = "token";
    pub const TOKEN_EXPIRY: &str = "tokenExpiry";
    pub const USERNAME: &str = "username";
    pub const USER_ID: &str = "user_id";
    pub const BRAND_NAME: &str = "brand_name";
    pub const BUSINESS_TYPE: &str = "business_type";

    /// Cleared together on logout or expiry; brand fields survive
    pub const SESSION_KEYS: &[&str] = &[TOKEN, TOKEN_EXPIRY, USERNAME, USER_ID];
}

pub type StorageResult<T> = Result<T, SessionError>;

/// Key/value backend behind [`super::SessionContext`]
#[async_trait]
pub trait SessionStorage: Send + Sync {
    async fn get(&self, key: &str) -> StorageResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> StorageResult<()>;
    async fn remove(&self, key: &str) -> StorageResult<()>;
}

/// Volatile storage, for tests and one-shot tools
#[derive(Default)]
pub struct MemorySessionStorage {
    values: Mutex<BTreeMap<String, String>>,
}

impl MemorySessionStorage {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStorage for MemorySessionStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        self.values
            .lock()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        self.values.lock().await.remove(key);
        Ok(())
    }
}

/// JSON document on disk holding the well-known keys
pub struct FileSessionStorage {
    path: PathBuf,
    values: Mutex<BTreeMap<String, String>>,
}

impl FileSessionStorage {
    /// Open (or lazily create) the document at `path`
    pub async fn open(path: impl AsRef<Path>) -> StorageResult<Self> {
        let path = path.as_ref().to_path_buf();
        let values = match tokio::fs::read(&path).await {
            Ok(bytes) if bytes.is_empty() => BTreeMap::new(),
            Ok(bytes) => serde_json::from_slice(&bytes)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => BTreeMap::new(),
            Err(e) => return Err(e.into()),
        };
        debug!(path = %path.display(), keys = values.len(), "[Session] Opened storage");
        Ok(Self {
            path,
            values: Mutex::new(values),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn flush(&self, values: &BTreeMap<String, String>) -> StorageResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        let bytes = serde_json::to_vec_pretty(values)?;
        tokio::fs::write(&self.path, bytes).await?;
        Ok(())
    }
}

#[async_trait]
impl SessionStorage for FileSessionStorage {
    async fn get(&self, key: &str) -> StorageResult<Option<String>> {
        Ok(self.values.lock().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> StorageResult<()> {
        let mut values = self.values.lock().await;
        values.insert(key.to_string(), value.to_string());
        self.flush(&values).await
    }

    async fn remove(&self, key: &str) -> StorageResult<()> {
        let mut values = self.values.lock().await;
        if values.remove(key).is_some() {
            self.flush(&values).await?;
        }
        Ok(())
    }
}
