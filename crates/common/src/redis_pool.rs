use redis::AsyncCommands;
use redis::Client;
use redis::aio::ConnectionManager;
use tokio::sync::OnceCell;

use crate::error::AppError;
use crate::store::{KeyValueStore, SettingKey};

/// Key prefix that namespaces this worker's settings in a shared Redis.
const NAMESPACE: &str = "cubstars-parent:settings:";

/// Redis-backed settings store.
///
/// The connection manager is created on first use; until then nothing is
/// dialed, and a failed connect is retried on the next operation.
pub struct RedisStore {
    client: Client,
    manager: OnceCell<ConnectionManager>,
}

impl RedisStore {
    pub fn new(redis_url: &str) -> Result<Self, AppError> {
        Ok(Self {
            client: Client::open(redis_url)?,
            manager: OnceCell::new(),
        })
    }

    async fn connection(&self) -> Result<ConnectionManager, AppError> {
        let manager = self
            .manager
            .get_or_try_init(|| async {
                let manager = ConnectionManager::new(self.client.clone()).await?;
                tracing::info!("Connected to Redis settings store");
                Ok::<_, AppError>(manager)
            })
            .await?;
        Ok(manager.clone())
    }

    fn namespaced(key: SettingKey) -> String {
        format!("{NAMESPACE}{}", key.as_str())
    }
}

impl KeyValueStore for RedisStore {
    async fn read(&self, key: SettingKey) -> Result<Option<String>, AppError> {
        let mut conn = self.connection().await?;
        let value: Option<String> = conn.get(Self::namespaced(key)).await?;
        Ok(value)
    }

    async fn write(&self, key: SettingKey, value: String) -> Result<(), AppError> {
        let mut conn = self.connection().await?;
        conn.set::<_, _, ()>(Self::namespaced(key), value).await?;
        Ok(())
    }
}
