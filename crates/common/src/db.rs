use std::str::FromStr;
use std::time::Duration;

use sqlx::SqlitePool;
use sqlx::sqlite::{SqliteConnectOptions, SqlitePoolOptions};
use tokio::sync::OnceCell;

use crate::error::AppError;
use crate::store::{KeyValueStore, SettingKey};

const CREATE_SETTINGS_TABLE: &str = r#"
    CREATE TABLE IF NOT EXISTS settings (
        key   TEXT PRIMARY KEY NOT NULL,
        value TEXT NOT NULL
    )
"#;

/// SQLite-backed settings store.
///
/// The pool connects lazily and the `settings` table is created on first use,
/// so opening the store never touches the disk.
pub struct SqliteStore {
    pool: SqlitePool,
    schema: OnceCell<()>,
}

impl SqliteStore {
    /// Create a lazily-connected store for a `sqlite:` URL.
    ///
    /// The database file is created if it does not exist yet.
    pub fn connect_lazy(database_url: &str) -> Result<Self, AppError> {
        let options = SqliteConnectOptions::from_str(database_url)?.create_if_missing(true);
        Ok(Self::with_options(options))
    }

    /// Create a lazily-connected store from explicit connection options.
    pub fn with_options(options: SqliteConnectOptions) -> Self {
        let pool = SqlitePoolOptions::new()
            .max_connections(1)
            .acquire_timeout(Duration::from_secs(5))
            .connect_lazy_with(options);

        Self {
            pool,
            schema: OnceCell::new(),
        }
    }

    /// Create the settings table if needed. A failed attempt is retried on the
    /// next call.
    async fn ensure_schema(&self) -> Result<(), AppError> {
        self.schema
            .get_or_try_init(|| async {
                sqlx::query(CREATE_SETTINGS_TABLE)
                    .execute(&self.pool)
                    .await?;
                tracing::debug!("Settings table ready");
                Ok::<(), AppError>(())
            })
            .await?;
        Ok(())
    }
}

impl KeyValueStore for SqliteStore {
    async fn read(&self, key: SettingKey) -> Result<Option<String>, AppError> {
        self.ensure_schema().await?;

        let row: Option<(String,)> = sqlx::query_as("SELECT value FROM settings WHERE key = ?1")
            .bind(key.as_str())
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(value,)| value))
    }

    async fn write(&self, key: SettingKey, value: String) -> Result<(), AppError> {
        self.ensure_schema().await?;

        sqlx::query(
            r#"
            INSERT INTO settings (key, value)
            VALUES (?1, ?2)
            ON CONFLICT (key) DO UPDATE SET value = excluded.value
            "#,
        )
        .bind(key.as_str())
        .bind(value)
        .execute(&self.pool)
        .await?;

        Ok(())
    }
}
