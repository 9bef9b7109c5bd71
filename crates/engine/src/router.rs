//! Notification router: sends a clicked notification back into the app.
//!
//! One decision per click: focus the first open app window, otherwise open a
//! new one. Nothing is remembered between clicks; the host's window list is
//! the only state consulted.

use std::sync::Arc;

use cubstars_common::config::AppConfig;

use crate::host::{NotificationHost, WindowClient};

/// What the user did with a displayed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClickAction {
    /// Click on the notification body rather than a button.
    Default,
    Open,
    Dismiss,
    Other(String),
}

impl ClickAction {
    pub fn parse(action: &str) -> Self {
        match action {
            "" => ClickAction::Default,
            "open" => ClickAction::Open,
            "dismiss" => ClickAction::Dismiss,
            other => ClickAction::Other(other.to_string()),
        }
    }
}

/// A click on a previously displayed notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClickEvent {
    pub action: ClickAction,
    /// Tag of the clicked notification
    pub tag: String,
    /// Data payload stored with the notification, if any
    pub target_url: Option<String>,
}

/// Result of routing one click.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RouteOutcome {
    Dismissed,
    Focused { window_id: String },
    Opened { url: String },
    /// The host refused the focus or open request.
    Failed,
}

pub struct NotificationRouter<H> {
    host: Arc<H>,
    app_url_marker: String,
    default_app_url: String,
}

impl<H: NotificationHost> NotificationRouter<H> {
    pub fn new(host: Arc<H>, config: &AppConfig) -> Self {
        Self {
            host,
            app_url_marker: config.app_url_marker.clone(),
            default_app_url: config.default_app_url.clone(),
        }
    }

    /// Route a click: close the notification, then focus or open the app.
    pub async fn route(&self, event: &ClickEvent) -> RouteOutcome {
        if let Err(e) = self.host.close_notification(&event.tag).await {
            tracing::warn!(tag = %event.tag, error = %e, "Failed to close clicked notification");
        }

        if event.action == ClickAction::Dismiss {
            tracing::debug!(tag = %event.tag, "Notification dismissed");
            return RouteOutcome::Dismissed;
        }

        let windows = match self.host.match_windows().await {
            Ok(windows) => windows,
            Err(e) => {
                tracing::warn!(error = %e, "Window enumeration failed, opening a new window");
                Vec::new()
            }
        };

        if let Some(window) = windows.iter().find(|w| self.is_app_window(w)) {
            return match self.host.focus_window(&window.id).await {
                Ok(()) => RouteOutcome::Focused {
                    window_id: window.id.clone(),
                },
                Err(e) => {
                    tracing::warn!(window_id = %window.id, error = %e, "Failed to focus app window");
                    RouteOutcome::Failed
                }
            };
        }

        let url = event
            .target_url
            .as_deref()
            .filter(|url| !url.is_empty())
            .unwrap_or(self.default_app_url.as_str())
            .to_string();

        match self.host.open_window(&url).await {
            Ok(()) => RouteOutcome::Opened { url },
            Err(e) => {
                tracing::warn!(url = %url, error = %e, "Failed to open app window");
                RouteOutcome::Failed
            }
        }
    }

    fn is_app_window(&self, window: &WindowClient) -> bool {
        window.focusable && window.url.contains(&self.app_url_marker)
    }
}
