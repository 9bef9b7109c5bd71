//! Host seam. Everything the worker asks of its embedding environment.
//!
//! Display, window management and lifecycle housekeeping are owned by the
//! host; the engine only decides what to request.

use std::future::Future;

use cubstars_common::error::AppError;
use cubstars_common::types::DisplayRequest;

/// An application window the host knows about.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowClient {
    /// Host-assigned identifier used for focus requests
    pub id: String,
    pub url: String,
    /// Whether the host is able to bring this window to the foreground
    pub focusable: bool,
}

/// Embedding environment of the worker.
pub trait NotificationHost: Send + Sync {
    /// Display a notification. A notification with the same tag is replaced.
    fn show_notification(
        &self,
        request: DisplayRequest,
    ) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Close the displayed notification carrying `tag`.
    fn close_notification(&self, tag: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// List open windows, including ones this worker does not control, in
    /// host enumeration order.
    fn match_windows(&self) -> impl Future<Output = Result<Vec<WindowClient>, AppError>> + Send;

    /// Bring an existing window to the foreground.
    fn focus_window(&self, window_id: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Open a new window at `url`.
    fn open_window(&self, url: &str) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Activate a freshly installed worker without waiting for old clients.
    fn skip_waiting(&self) -> impl Future<Output = Result<(), AppError>> + Send;

    /// Take control of already-open windows after activation.
    fn claim_clients(&self) -> impl Future<Output = Result<(), AppError>> + Send;
}
