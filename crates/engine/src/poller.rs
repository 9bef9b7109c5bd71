use std::sync::Arc;

use cubstars_common::config::AppConfig;
use cubstars_common::error::AppError;
use cubstars_common::store::{KeyValueStore, SettingKey};
use cubstars_common::types::{
    DisplayRequest, NotificationAction, NotificationOptions, PendingSummary, StatusResponse,
    StatusSnapshot, WatermarkPolicy,
};

use crate::aggregator::ApprovalAggregator;
use crate::dedup::DedupGate;
use crate::host::NotificationHost;

pub const PENDING_TAG: &str = "pending-approvals";
pub const PENDING_ICON: &str = r#"data:image/svg+xml,<svg xmlns="http://www.w3.org/2000/svg" viewBox="0 0 100 100"><text y=".9em" font-size="90">✅</text></svg>"#;

/// Result of a single approval check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollOutcome {
    /// No status endpoint configured; nothing was fetched.
    NoEndpoint,
    /// Fetch or decode failed; the next trigger tries again.
    Failed,
    /// The endpoint reported nothing awaiting approval.
    NothingPending,
    /// Approvals are pending but were already notified.
    Suppressed { count: u64 },
    /// A notification was shown for `count` pending approvals.
    Notified { count: u64 },
    /// The watermark advanced to `count` but the host refused to display.
    /// The same count is not retried.
    DisplayFailed { count: u64 },
}

/// Polls the status endpoint and notifies about newly pending approvals.
pub struct ApprovalPoller<S, H> {
    store: Arc<S>,
    gate: Arc<DedupGate<S>>,
    host: Arc<H>,
    http: reqwest::Client,
    query_action: String,
    watermark_policy: WatermarkPolicy,
}

impl<S, H> ApprovalPoller<S, H>
where
    S: KeyValueStore,
    H: NotificationHost,
{
    pub fn new(
        store: Arc<S>,
        gate: Arc<DedupGate<S>>,
        host: Arc<H>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let http = reqwest::Client::builder()
            .timeout(config.status_timeout())
            .build()?;

        Ok(Self {
            store,
            gate,
            host,
            http,
            query_action: config.status_query_action.clone(),
            watermark_policy: config.watermark_policy,
        })
    }

    /// Run one approval check to completion.
    ///
    /// Never fails: every error is logged and reported as `PollOutcome::Failed`.
    pub async fn poll(&self) -> PollOutcome {
        let api_url = self
            .store
            .get_text(SettingKey::ApiUrl)
            .await
            .filter(|url| !url.trim().is_empty());

        let Some(api_url) = api_url else {
            tracing::debug!("No status endpoint configured, skipping approval check");
            return PollOutcome::NoEndpoint;
        };

        let snapshot = match self.fetch_snapshot(&api_url).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                tracing::warn!(error = %e, kind = e.kind(), "Approval check failed");
                return PollOutcome::Failed;
            }
        };

        let summary = ApprovalAggregator::summarize(&snapshot);
        let count = summary.total_count;

        if count == 0 {
            if self.watermark_policy == WatermarkPolicy::ResetOnClear {
                self.gate.clear().await;
            }
            return PollOutcome::NothingPending;
        }

        if !self.gate.should_notify(count).await {
            return PollOutcome::Suppressed { count };
        }

        match self
            .host
            .show_notification(Self::pending_notification(&summary))
            .await
        {
            Ok(()) => {
                tracing::info!(count, "Pending approvals notification shown");
                PollOutcome::Notified { count }
            }
            Err(e) => {
                tracing::warn!(count, error = %e, "Pending approvals notification could not be shown");
                PollOutcome::DisplayFailed { count }
            }
        }
    }

    /// Fetch and validate the status snapshot.
    async fn fetch_snapshot(&self, api_url: &str) -> Result<StatusSnapshot, AppError> {
        let response = self
            .http
            .get(api_url)
            .query(&[("action", self.query_action.as_str())])
            .send()
            .await?
            .error_for_status()?;

        let body: StatusResponse = response
            .json()
            .await
            .map_err(|e| AppError::MalformedStatus(e.to_string()))?;

        if !body.success {
            return Err(AppError::MalformedStatus(
                "endpoint reported success = false".to_string(),
            ));
        }

        body.data
            .ok_or_else(|| AppError::MalformedStatus("response has no data".to_string()))
    }

    /// Build the "tasks waiting" notification for a summary.
    pub fn pending_notification(summary: &PendingSummary) -> DisplayRequest {
        let count = summary.total_count;
        let mut body = summary
            .preview_items
            .iter()
            .map(ToString::to_string)
            .collect::<Vec<_>>()
            .join(", ");
        if summary.truncated {
            body.push_str("...");
        }

        DisplayRequest {
            title: format!("📋 {} {} Waiting!", count, task_label(count)),
            options: NotificationOptions {
                body,
                icon: PENDING_ICON.to_string(),
                badge: None,
                tag: PENDING_TAG.to_string(),
                require_interaction: true,
                actions: vec![NotificationAction::new("open", "📱 Review Now")],
                data: None,
            },
        }
    }
}

fn task_label(count: u64) -> &'static str {
    if count == 1 { "Task" } else { "Tasks" }
}

#[cfg(test)]
mod tests {
    use cubstars_common::store::MemoryStore;
    use cubstars_common::types::PreviewItem;

    use super::*;

    /// Host that must never be reached.
    struct NoHost;

    impl NotificationHost for NoHost {
        async fn show_notification(&self, _request: DisplayRequest) -> Result<(), AppError> {
            panic!("no notification expected");
        }
        async fn close_notification(&self, _tag: &str) -> Result<(), AppError> {
            Ok(())
        }
        async fn match_windows(&self) -> Result<Vec<crate::host::WindowClient>, AppError> {
            Ok(Vec::new())
        }
        async fn focus_window(&self, _window_id: &str) -> Result<(), AppError> {
            Ok(())
        }
        async fn open_window(&self, _url: &str) -> Result<(), AppError> {
            Ok(())
        }
        async fn skip_waiting(&self) -> Result<(), AppError> {
            Ok(())
        }
        async fn claim_clients(&self) -> Result<(), AppError> {
            Ok(())
        }
    }

    fn item(child: &str, task: &str) -> PreviewItem {
        PreviewItem {
            child_name: child.to_string(),
            task_name: task.to_string(),
        }
    }

    fn poller(store: Arc<MemoryStore>) -> ApprovalPoller<MemoryStore, NoHost> {
        let gate = Arc::new(DedupGate::new(store.clone()));
        ApprovalPoller::new(store, gate, Arc::new(NoHost), &AppConfig::default()).unwrap()
    }

    #[test]
    fn test_single_task_title_is_singular() {
        let summary = PendingSummary {
            total_count: 1,
            preview_items: vec![item("Ava", "Dishes")],
            truncated: false,
        };
        let request = ApprovalPoller::<MemoryStore, NoHost>::pending_notification(&summary);
        assert_eq!(request.title, "📋 1 Task Waiting!");
        assert_eq!(request.options.body, "Ava: Dishes");
        assert_eq!(request.options.tag, PENDING_TAG);
        assert!(request.options.data.is_none());
    }

    #[test]
    fn test_truncated_body_has_ellipsis() {
        let summary = PendingSummary {
            total_count: 5,
            preview_items: vec![
                item("Ava", "Dishes"),
                item("Ava", "Laundry"),
                item("Ben", "Homework"),
            ],
            truncated: true,
        };
        let request = ApprovalPoller::<MemoryStore, NoHost>::pending_notification(&summary);
        assert_eq!(request.title, "📋 5 Tasks Waiting!");
        assert_eq!(
            request.options.body,
            "Ava: Dishes, Ava: Laundry, Ben: Homework..."
        );
        assert_eq!(request.options.actions.len(), 1);
        assert!(request.options.require_interaction);
    }

    #[tokio::test]
    async fn test_missing_endpoint_is_a_no_op() {
        let poller = poller(Arc::new(MemoryStore::new()));
        assert_eq!(poller.poll().await, PollOutcome::NoEndpoint);
    }

    #[tokio::test]
    async fn test_blank_endpoint_is_a_no_op() {
        let store = Arc::new(MemoryStore::new());
        store.put(SettingKey::ApiUrl, "  ").await;
        assert_eq!(poller(store).poll().await, PollOutcome::NoEndpoint);
    }

    #[tokio::test]
    async fn test_unavailable_store_skips_fetch() {
        let store = Arc::new(MemoryStore::new());
        store.put(SettingKey::ApiUrl, "http://127.0.0.1:9/exec").await;
        store.set_available(false);
        assert_eq!(poller(store).poll().await, PollOutcome::NoEndpoint);
    }

    #[tokio::test]
    async fn test_bare_text_endpoint_is_fetched() {
        let store = Arc::new(MemoryStore::new());
        store
            .write(SettingKey::ApiUrl, "http://127.0.0.1:9/exec".to_string())
            .await
            .unwrap();
        // Nothing listens on the discard port, so the attempt itself fails
        assert_eq!(poller(store).poll().await, PollOutcome::Failed);
    }

    #[tokio::test]
    async fn test_unparseable_endpoint_fails_quietly() {
        let store = Arc::new(MemoryStore::new());
        store.put(SettingKey::ApiUrl, "not a url").await;
        assert_eq!(poller(store).poll().await, PollOutcome::Failed);
    }
}
