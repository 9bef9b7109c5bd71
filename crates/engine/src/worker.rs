//! Worker event dispatch.
//!
//! Every trigger the host delivers is a `WorkerEvent`:
//! 1. `Install` / `Activate` → lifecycle housekeeping on the host
//! 2. `Push` → resolve the payload (`PushPayloadResolver`) and display it
//! 3. `Sync` / `PeriodicSync` with the check-approvals tag → `ApprovalPoller`
//! 4. `NotificationClick` → `NotificationRouter`
//!
//! `WorkerRuntime` keeps each dispatched event alive until it completes, so a
//! pending store write is never dropped halfway.

use std::str::FromStr;
use std::sync::Arc;

use tokio::task::JoinSet;

use cubstars_common::config::AppConfig;
use cubstars_common::error::AppError;
use cubstars_common::store::KeyValueStore;

use crate::dedup::DedupGate;
use crate::host::NotificationHost;
use crate::payload::PushPayloadResolver;
use crate::poller::{ApprovalPoller, PollOutcome};
use crate::router::{ClickEvent, NotificationRouter, RouteOutcome};

/// Background sync tag that requests an approval check.
pub const CHECK_APPROVALS_TAG: &str = "check-approvals";

/// Tag carried by a sync or periodic-sync trigger.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncTag {
    CheckApprovals,
    Other(String),
}

impl FromStr for SyncTag {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Ok(match s {
            CHECK_APPROVALS_TAG => SyncTag::CheckApprovals,
            other => SyncTag::Other(other.to_string()),
        })
    }
}

impl std::fmt::Display for SyncTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SyncTag::CheckApprovals => write!(f, "{CHECK_APPROVALS_TAG}"),
            SyncTag::Other(tag) => write!(f, "{tag}"),
        }
    }
}

/// A trigger delivered by the host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WorkerEvent {
    Install,
    Activate,
    /// Push message with its raw data, if any
    Push(Option<Vec<u8>>),
    Sync(SyncTag),
    PeriodicSync(SyncTag),
    NotificationClick(ClickEvent),
}

impl WorkerEvent {
    fn name(&self) -> &'static str {
        match self {
            WorkerEvent::Install => "install",
            WorkerEvent::Activate => "activate",
            WorkerEvent::Push(_) => "push",
            WorkerEvent::Sync(_) => "sync",
            WorkerEvent::PeriodicSync(_) => "periodicsync",
            WorkerEvent::NotificationClick(_) => "notificationclick",
        }
    }
}

/// What handling an event amounted to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EventOutcome {
    Installed,
    Activated,
    /// A push notification was handed to the host.
    Displayed { tag: String },
    Polled(PollOutcome),
    Routed(RouteOutcome),
    /// The event carried a tag this worker does not handle.
    Ignored,
    /// The host rejected a lifecycle or display request.
    HostFailed,
}

/// Dispatches host triggers to the engine components.
pub struct Worker<S, H> {
    host: Arc<H>,
    gate: Arc<DedupGate<S>>,
    poller: ApprovalPoller<S, H>,
    router: NotificationRouter<H>,
}

impl<S, H> Worker<S, H>
where
    S: KeyValueStore,
    H: NotificationHost,
{
    /// Build a worker with its own dedup gate over `store`.
    ///
    /// Watermark updates are only serialized within one gate. When several
    /// workers share a store, build the first with `new` and the rest with
    /// `with_gate(.., first.gate(), ..)`.
    pub fn new(store: Arc<S>, host: Arc<H>, config: &AppConfig) -> Result<Self, AppError> {
        let gate = Arc::new(DedupGate::new(store.clone()));
        Self::with_gate(store, gate, host, config)
    }

    /// Build a worker that decides through an existing dedup gate.
    pub fn with_gate(
        store: Arc<S>,
        gate: Arc<DedupGate<S>>,
        host: Arc<H>,
        config: &AppConfig,
    ) -> Result<Self, AppError> {
        let poller = ApprovalPoller::new(store, gate.clone(), host.clone(), config)?;
        let router = NotificationRouter::new(host.clone(), config);

        Ok(Self {
            host,
            gate,
            poller,
            router,
        })
    }

    /// The dedup gate this worker notifies through.
    pub fn gate(&self) -> Arc<DedupGate<S>> {
        self.gate.clone()
    }

    /// Handle one event to completion. Never fails; problems are logged and
    /// reflected in the outcome.
    pub async fn handle(&self, event: WorkerEvent) -> EventOutcome {
        tracing::debug!(event = event.name(), "Handling worker event");

        match event {
            WorkerEvent::Install => match self.host.skip_waiting().await {
                Ok(()) => {
                    tracing::info!("Worker installed");
                    EventOutcome::Installed
                }
                Err(e) => {
                    tracing::warn!(error = %e, "skip_waiting failed during install");
                    EventOutcome::HostFailed
                }
            },
            WorkerEvent::Activate => match self.host.claim_clients().await {
                Ok(()) => {
                    tracing::info!("Worker activated");
                    EventOutcome::Activated
                }
                Err(e) => {
                    tracing::warn!(error = %e, "claim_clients failed during activate");
                    EventOutcome::HostFailed
                }
            },
            WorkerEvent::Push(data) => {
                let descriptor = PushPayloadResolver::resolve(data.as_deref());
                let tag = descriptor.tag.clone();
                match self
                    .host
                    .show_notification(descriptor.into_display_request())
                    .await
                {
                    Ok(()) => EventOutcome::Displayed { tag },
                    Err(e) => {
                        tracing::warn!(tag = %tag, error = %e, "Push notification could not be shown");
                        EventOutcome::HostFailed
                    }
                }
            }
            WorkerEvent::Sync(SyncTag::CheckApprovals)
            | WorkerEvent::PeriodicSync(SyncTag::CheckApprovals) => {
                EventOutcome::Polled(self.poller.poll().await)
            }
            WorkerEvent::Sync(SyncTag::Other(tag)) | WorkerEvent::PeriodicSync(SyncTag::Other(tag)) => {
                tracing::debug!(tag = %tag, "Ignoring sync with unknown tag");
                EventOutcome::Ignored
            }
            WorkerEvent::NotificationClick(click) => {
                EventOutcome::Routed(self.router.route(&click).await)
            }
        }
    }
}

/// Runs dispatched events as tasks and keeps them alive until completion.
pub struct WorkerRuntime<S, H> {
    worker: Arc<Worker<S, H>>,
    tasks: JoinSet<EventOutcome>,
}

impl<S, H> WorkerRuntime<S, H>
where
    S: KeyValueStore + 'static,
    H: NotificationHost + 'static,
{
    pub fn new(worker: Arc<Worker<S, H>>) -> Self {
        Self {
            worker,
            tasks: JoinSet::new(),
        }
    }

    /// Start handling `event` concurrently with any events already in flight.
    pub fn dispatch(&mut self, event: WorkerEvent) {
        while let Some(finished) = self.tasks.try_join_next() {
            Self::log_finished(finished);
        }

        let worker = self.worker.clone();
        self.tasks.spawn(async move { worker.handle(event).await });
    }

    /// Number of events still running.
    pub fn in_flight(&self) -> usize {
        self.tasks.len()
    }

    /// Wait for every in-flight event to finish and return their outcomes.
    pub async fn drain(&mut self) -> Vec<EventOutcome> {
        let mut outcomes = Vec::new();
        while let Some(finished) = self.tasks.join_next().await {
            if let Some(outcome) = Self::log_finished(finished) {
                outcomes.push(outcome);
            }
        }
        outcomes
    }

    fn log_finished(
        finished: Result<EventOutcome, tokio::task::JoinError>,
    ) -> Option<EventOutcome> {
        match finished {
            Ok(outcome) => {
                tracing::debug!(outcome = ?outcome, "Worker event finished");
                Some(outcome)
            }
            Err(e) => {
                tracing::error!(error = %e, "Worker event task aborted");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Mutex;

    use cubstars_common::store::{MemoryStore, SettingKey};
    use cubstars_common::types::DisplayRequest;

    use super::*;
    use crate::host::WindowClient;
    use crate::router::ClickAction;

    #[derive(Default)]
    struct RecordingHost {
        shown: Mutex<Vec<DisplayRequest>>,
        lifecycle: Mutex<Vec<&'static str>>,
        refuse_display: bool,
    }

    impl NotificationHost for RecordingHost {
        async fn show_notification(&self, request: DisplayRequest) -> Result<(), AppError> {
            if self.refuse_display {
                return Err(AppError::Host("permission denied".to_string()));
            }
            self.shown.lock().unwrap().push(request);
            Ok(())
        }
        async fn close_notification(&self, _tag: &str) -> Result<(), AppError> {
            Ok(())
        }
        async fn match_windows(&self) -> Result<Vec<WindowClient>, AppError> {
            Ok(Vec::new())
        }
        async fn focus_window(&self, _window_id: &str) -> Result<(), AppError> {
            Ok(())
        }
        async fn open_window(&self, _url: &str) -> Result<(), AppError> {
            Ok(())
        }
        async fn skip_waiting(&self) -> Result<(), AppError> {
            self.lifecycle.lock().unwrap().push("skip_waiting");
            Ok(())
        }
        async fn claim_clients(&self) -> Result<(), AppError> {
            self.lifecycle.lock().unwrap().push("claim_clients");
            Ok(())
        }
    }

    fn worker(host: Arc<RecordingHost>) -> Worker<MemoryStore, RecordingHost> {
        Worker::new(Arc::new(MemoryStore::new()), host, &AppConfig::default()).unwrap()
    }

    #[test]
    fn test_sync_tag_parsing() {
        assert_eq!(
            "check-approvals".parse::<SyncTag>(),
            Ok(SyncTag::CheckApprovals)
        );
        assert_eq!(
            "refresh-cache".parse::<SyncTag>(),
            Ok(SyncTag::Other("refresh-cache".to_string()))
        );
        assert_eq!(SyncTag::CheckApprovals.to_string(), "check-approvals");
    }

    #[tokio::test]
    async fn test_lifecycle_events_reach_host() {
        let host = Arc::new(RecordingHost::default());
        let worker = worker(host.clone());

        assert_eq!(worker.handle(WorkerEvent::Install).await, EventOutcome::Installed);
        assert_eq!(worker.handle(WorkerEvent::Activate).await, EventOutcome::Activated);
        assert_eq!(
            *host.lifecycle.lock().unwrap(),
            vec!["skip_waiting", "claim_clients"]
        );
    }

    #[tokio::test]
    async fn test_push_displays_resolved_payload() {
        let host = Arc::new(RecordingHost::default());
        let worker = worker(host.clone());

        let outcome = worker
            .handle(WorkerEvent::Push(Some(
                br#"{"title": "Stars!", "url": "./parent_app.html"}"#.to_vec(),
            )))
            .await;

        assert_eq!(
            outcome,
            EventOutcome::Displayed {
                tag: "cubstars-notification".to_string()
            }
        );
        let shown = host.shown.lock().unwrap();
        assert_eq!(shown.len(), 1);
        assert_eq!(shown[0].title, "Stars!");
        assert_eq!(shown[0].options.data.as_deref(), Some("./parent_app.html"));
    }

    #[tokio::test]
    async fn test_push_without_data_uses_defaults() {
        let host = Arc::new(RecordingHost::default());
        worker(host.clone()).handle(WorkerEvent::Push(None)).await;

        let shown = host.shown.lock().unwrap();
        assert_eq!(shown[0].title, "🌟 Cub Stars");
        assert_eq!(shown[0].options.data.as_deref(), Some("./"));
    }

    #[tokio::test]
    async fn test_refused_display_is_not_fatal() {
        let host = Arc::new(RecordingHost {
            refuse_display: true,
            ..Default::default()
        });
        let worker = worker(host);

        assert_eq!(
            worker.handle(WorkerEvent::Push(None)).await,
            EventOutcome::HostFailed
        );
        // The next event is still handled
        assert_eq!(worker.handle(WorkerEvent::Install).await, EventOutcome::Installed);
    }

    #[tokio::test]
    async fn test_unknown_sync_tag_is_ignored() {
        let worker = worker(Arc::new(RecordingHost::default()));
        assert_eq!(
            worker
                .handle(WorkerEvent::PeriodicSync(SyncTag::Other("x".to_string())))
                .await,
            EventOutcome::Ignored
        );
    }

    #[tokio::test]
    async fn test_check_approvals_without_endpoint() {
        let store = Arc::new(MemoryStore::new());
        let worker = Worker::new(
            store.clone(),
            Arc::new(RecordingHost::default()),
            &AppConfig::default(),
        )
        .unwrap();

        assert_eq!(
            worker.handle(WorkerEvent::Sync(SyncTag::CheckApprovals)).await,
            EventOutcome::Polled(PollOutcome::NoEndpoint)
        );
        assert_eq!(store.get(SettingKey::LastNotifiedCount, 0u64).await, 0);
    }

    #[tokio::test]
    async fn test_workers_can_share_a_gate() {
        let store = Arc::new(MemoryStore::new());
        let host = Arc::new(RecordingHost::default());
        let config = AppConfig::default();
        let first = Worker::new(store.clone(), host.clone(), &config).unwrap();
        let second = Worker::with_gate(store, first.gate(), host, &config).unwrap();

        assert!(Arc::ptr_eq(&first.gate(), &second.gate()));
        assert!(first.gate().should_notify(2).await);
        assert!(!second.gate().should_notify(2).await);
    }

    #[tokio::test]
    async fn test_click_is_routed() {
        let worker = worker(Arc::new(RecordingHost::default()));
        let outcome = worker
            .handle(WorkerEvent::NotificationClick(ClickEvent {
                action: ClickAction::Dismiss,
                tag: "pending-approvals".to_string(),
                target_url: None,
            }))
            .await;
        assert_eq!(outcome, EventOutcome::Routed(RouteOutcome::Dismissed));
    }

    #[tokio::test]
    async fn test_runtime_drains_in_flight_events() {
        let host = Arc::new(RecordingHost::default());
        let mut runtime = WorkerRuntime::new(Arc::new(worker(host.clone())));

        runtime.dispatch(WorkerEvent::Install);
        runtime.dispatch(WorkerEvent::Push(None));
        runtime.dispatch(WorkerEvent::Push(Some(b"hello".to_vec())));

        let outcomes = runtime.drain().await;
        assert_eq!(outcomes.len(), 3);
        assert_eq!(runtime.in_flight(), 0);
        assert_eq!(host.shown.lock().unwrap().len(), 2);
    }
}
