use serde::Deserialize;

use crate::types::WatermarkPolicy;

/// Global worker configuration loaded from environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    /// Settings store location: `sqlite://path.db` or `redis://host:port`
    pub store_url: String,

    /// Upper bound on a single status fetch in milliseconds (default: 10000)
    pub status_timeout_ms: u64,

    /// Value of the `action` query parameter sent to the status endpoint
    pub status_query_action: String,

    /// Periodic sync interval in seconds (default: 900)
    pub sync_interval_secs: u64,

    /// Substring identifying this app's windows when routing clicks
    pub app_url_marker: String,

    /// URL opened when a clicked notification carries no target
    pub default_app_url: String,

    /// What happens to the dedup watermark once nothing is pending
    pub watermark_policy: WatermarkPolicy,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_url: "sqlite://cubstars-parent.db".to_string(),
            status_timeout_ms: 10_000,
            status_query_action: "getData".to_string(),
            sync_interval_secs: 900,
            app_url_marker: "parent_app".to_string(),
            default_app_url: "./parent_app.html".to_string(),
            watermark_policy: WatermarkPolicy::ResetOnClear,
        }
    }
}

impl AppConfig {
    /// Load configuration from environment variables.
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build configuration from an arbitrary variable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> anyhow::Result<Self> {
        let defaults = Self::default();

        Ok(Self {
            store_url: lookup("STORE_URL").unwrap_or(defaults.store_url),
            status_timeout_ms: match lookup("STATUS_TIMEOUT_MS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("STATUS_TIMEOUT_MS must be a valid u64"))?,
                None => defaults.status_timeout_ms,
            },
            status_query_action: lookup("STATUS_QUERY_ACTION")
                .unwrap_or(defaults.status_query_action),
            sync_interval_secs: match lookup("SYNC_INTERVAL_SECS") {
                Some(raw) => raw
                    .parse()
                    .map_err(|_| anyhow::anyhow!("SYNC_INTERVAL_SECS must be a valid u64"))?,
                None => defaults.sync_interval_secs,
            },
            app_url_marker: lookup("APP_URL_MARKER").unwrap_or(defaults.app_url_marker),
            default_app_url: lookup("DEFAULT_APP_URL").unwrap_or(defaults.default_app_url),
            watermark_policy: match lookup("WATERMARK_POLICY") {
                Some(raw) => raw
                    .parse::<WatermarkPolicy>()
                    .map_err(|e| anyhow::anyhow!(e))?,
                None => defaults.watermark_policy,
            },
        })
    }

    pub fn status_timeout(&self) -> std::time::Duration {
        std::time::Duration::from_millis(self.status_timeout_ms)
    }

    pub fn sync_interval(&self) -> std::time::Duration {
        std::time::Duration::from_secs(self.sync_interval_secs)
    }
}
