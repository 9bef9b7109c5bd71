//! Headless host: notifications become log lines, windows are never open.

use cubstars_common::error::AppError;
use cubstars_common::types::DisplayRequest;
use cubstars_engine::host::{NotificationHost, WindowClient};

pub struct TracingHost;

impl NotificationHost for TracingHost {
    async fn show_notification(&self, request: DisplayRequest) -> Result<(), AppError> {
        tracing::info!(
            title = %request.title,
            body = %request.options.body,
            tag = %request.options.tag,
            "Notification"
        );
        Ok(())
    }

    async fn close_notification(&self, tag: &str) -> Result<(), AppError> {
        tracing::debug!(tag, "Notification closed");
        Ok(())
    }

    async fn match_windows(&self) -> Result<Vec<WindowClient>, AppError> {
        Ok(Vec::new())
    }

    async fn focus_window(&self, window_id: &str) -> Result<(), AppError> {
        Err(AppError::Host(format!(
            "headless host has no window {window_id}"
        )))
    }

    async fn open_window(&self, url: &str) -> Result<(), AppError> {
        tracing::info!(url, "Open app window requested");
        Ok(())
    }

    async fn skip_waiting(&self) -> Result<(), AppError> {
        Ok(())
    }

    async fn claim_clients(&self) -> Result<(), AppError> {
        Ok(())
    }
}
