//! Persistent key-value settings store.
//!
//! The worker keeps exactly two logical keys across restarts: the status
//! endpoint URL written by the app's settings screen, and the dedup watermark.
//! Backends expose fallible `read`/`write` primitives; callers go through the
//! provided `get`/`put` methods, which never fail: errors are logged and the
//! caller's default (or a no-op) is used instead.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::db::SqliteStore;
use crate::error::AppError;
use crate::redis_pool::RedisStore;

/// The logical keys held in the settings store.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SettingKey {
    ApiUrl,
    LastNotifiedCount,
}

impl SettingKey {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingKey::ApiUrl => "apiUrl",
            SettingKey::LastNotifiedCount => "lastNotifiedCount",
        }
    }
}

impl std::fmt::Display for SettingKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Durable asynchronous settings storage.
///
/// Values travel as JSON text so both backends and external writers agree on
/// the encoding.
pub trait KeyValueStore: Send + Sync {
    /// Read the raw JSON value for `key`, `None` if it was never written.
    fn read(
        &self,
        key: SettingKey,
    ) -> impl Future<Output = Result<Option<String>, AppError>> + Send;

    /// Write the raw JSON value for `key`, replacing any previous value.
    fn write(
        &self,
        key: SettingKey,
        value: String,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Read `key`, resolving to `default` when it is missing, undecodable or
    /// the backend is unavailable.
    fn get<T>(&self, key: SettingKey, default: T) -> impl Future<Output = T> + Send
    where
        T: DeserializeOwned + Send,
    {
        async move {
            match self.read(key).await {
                Ok(Some(raw)) => match serde_json::from_str(&raw) {
                    Ok(value) => value,
                    Err(e) => {
                        tracing::warn!(key = %key, error = %e, "Stored setting is not decodable, using default");
                        default
                    }
                },
                Ok(None) => default,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, kind = e.kind(), "Settings read failed, using default");
                    default
                }
            }
        }
    }

    /// Read a string setting that other writers may store either JSON-encoded
    /// or as bare text.
    ///
    /// A JSON string or `null` is decoded; anything else is taken verbatim.
    /// Resolves to `None` when the key is missing or the backend is unavailable.
    fn get_text(&self, key: SettingKey) -> impl Future<Output = Option<String>> + Send {
        async move {
            match self.read(key).await {
                Ok(Some(raw)) => match serde_json::from_str::<Option<String>>(&raw) {
                    Ok(value) => value,
                    Err(_) => Some(raw),
                },
                Ok(None) => None,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, kind = e.kind(), "Settings read failed, treating as unset");
                    None
                }
            }
        }
    }

    /// Best-effort write of `value` under `key`. Failures are logged and dropped.
    fn put<T>(&self, key: SettingKey, value: &T) -> impl Future<Output = ()> + Send
    where
        T: Serialize + ?Sized,
    {
        let encoded = serde_json::to_string(value);
        async move {
            let raw = match encoded {
                Ok(raw) => raw,
                Err(e) => {
                    tracing::warn!(key = %key, error = %e, "Setting could not be encoded, write skipped");
                    return;
                }
            };
            if let Err(e) = self.write(key, raw).await {
                tracing::warn!(key = %key, error = %e, kind = e.kind(), "Settings write failed");
            }
        }
    }
}

/// In-process settings store.
///
/// State lives only as long as the value, so it stands in for a durable
/// backend in tests and in embedders that persist elsewhere.
#[derive(Debug)]
pub struct MemoryStore {
    values: Mutex<HashMap<SettingKey, String>>,
    available: AtomicBool,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self {
            values: Mutex::new(HashMap::new()),
            available: AtomicBool::new(true),
        }
    }

    /// Toggle whether reads and writes succeed.
    pub fn set_available(&self, available: bool) {
        self.available.store(available, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<(), AppError> {
        if self.available.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(AppError::StoreUnavailable("memory store disabled".to_string()))
        }
    }

    fn lock(&self) -> Result<std::sync::MutexGuard<'_, HashMap<SettingKey, String>>, AppError> {
        self.values
            .lock()
            .map_err(|_| AppError::StoreUnavailable("memory store poisoned".to_string()))
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

impl KeyValueStore for MemoryStore {
    async fn read(&self, key: SettingKey) -> Result<Option<String>, AppError> {
        self.check_available()?;
        Ok(self.lock()?.get(&key).cloned())
    }

    async fn write(&self, key: SettingKey, value: String) -> Result<(), AppError> {
        self.check_available()?;
        self.lock()?.insert(key, value);
        Ok(())
    }
}

/// Backend selected at startup from the configured store URL.
pub enum SettingsBackend {
    Sqlite(SqliteStore),
    Redis(RedisStore),
    Memory(MemoryStore),
}

/// Open the settings backend named by `url`.
///
/// `sqlite:` and `redis://`/`rediss://` URLs select the durable backends;
/// `memory:` keeps settings in-process. Connections are made lazily, so an
/// unreachable backend only degrades reads and writes later on.
pub fn open(url: &str) -> Result<SettingsBackend, AppError> {
    if url.starts_with("sqlite:") {
        Ok(SettingsBackend::Sqlite(SqliteStore::connect_lazy(url)?))
    } else if url.starts_with("redis://") || url.starts_with("rediss://") {
        Ok(SettingsBackend::Redis(RedisStore::new(url)?))
    } else if url == "memory:" {
        Ok(SettingsBackend::Memory(MemoryStore::new()))
    } else {
        Err(AppError::Config(format!("unsupported store URL: {url}")))
    }
}

impl KeyValueStore for SettingsBackend {
    async fn read(&self, key: SettingKey) -> Result<Option<String>, AppError> {
        match self {
            SettingsBackend::Sqlite(store) => store.read(key).await,
            SettingsBackend::Redis(store) => store.read(key).await,
            SettingsBackend::Memory(store) => store.read(key).await,
        }
    }

    async fn write(&self, key: SettingKey, value: String) -> Result<(), AppError> {
        match self {
            SettingsBackend::Sqlite(store) => store.write(key, value).await,
            SettingsBackend::Redis(store) => store.write(key, value).await,
            SettingsBackend::Memory(store) => store.write(key, value).await,
        }
    }
}

impl std::fmt::Debug for SettingsBackend {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SettingsBackend::Sqlite(_) => f.write_str("SettingsBackend::Sqlite"),
            SettingsBackend::Redis(_) => f.write_str("SettingsBackend::Redis"),
            SettingsBackend::Memory(_) => f.write_str("SettingsBackend::Memory"),
        }
    }
}
