use serde::{Deserialize, Serialize};

/// A button shown on a displayed notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NotificationAction {
    pub action: String,
    pub title: String,
}

impl NotificationAction {
    pub fn new(action: impl Into<String>, title: impl Into<String>) -> Self {
        Self {
            action: action.into(),
            title: title.into(),
        }
    }
}

/// Fully-populated notification ready to hand to the host for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationDescriptor {
    pub title: String,
    pub body: String,
    /// Icon URI (usually an inline SVG data URI)
    pub icon: String,
    /// Badge URI shown in the status bar
    pub badge: String,
    /// Grouping key; a new notification with the same tag replaces the old one
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    /// URL opened when the user clicks through
    pub target_url: String,
}

impl NotificationDescriptor {
    /// Build the host display request, carrying the target URL as the opaque data payload.
    pub fn into_display_request(self) -> DisplayRequest {
        DisplayRequest {
            title: self.title,
            options: NotificationOptions {
                body: self.body,
                icon: self.icon,
                badge: Some(self.badge),
                tag: self.tag,
                require_interaction: self.require_interaction,
                actions: self.actions,
                data: Some(self.target_url),
            },
        }
    }
}

/// Options half of a notification display request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationOptions {
    pub body: String,
    pub icon: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub badge: Option<String>,
    pub tag: String,
    pub require_interaction: bool,
    pub actions: Vec<NotificationAction>,
    /// Opaque payload echoed back on click (the target URL)
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<String>,
}

/// A request to display a notification through the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplayRequest {
    pub title: String,
    pub options: NotificationOptions,
}

/// A single task awaiting a parent's sign-off.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingApproval {
    pub task_name: String,
}

/// Status of one child as reported by the status endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChildStatus {
    pub name: String,
    #[serde(default)]
    pub pending_approvals: Vec<PendingApproval>,
}

/// Snapshot of every child's status, fetched fresh on each poll.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusSnapshot {
    pub children: Vec<ChildStatus>,
}

/// Envelope returned by the status endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatusResponse {
    pub success: bool,
    #[serde(default)]
    pub data: Option<StatusSnapshot>,
}

/// One `(child, task)` pair shown in a pending-approvals notification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PreviewItem {
    pub child_name: String,
    pub task_name: String,
}

impl std::fmt::Display for PreviewItem {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.child_name, self.task_name)
    }
}

/// Aggregate of all pending approvals across children.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PendingSummary {
    pub total_count: u64,
    /// At most three items, in encounter order
    pub preview_items: Vec<PreviewItem>,
    /// More pending entries exist than are previewed
    pub truncated: bool,
}

/// Whether the dedup watermark drops back to zero once nothing is pending.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WatermarkPolicy {
    /// Reset the watermark to 0 when a poll reports no pending approvals.
    #[default]
    ResetOnClear,
    /// Never lower the watermark.
    Sticky,
}

impl std::fmt::Display for WatermarkPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            WatermarkPolicy::ResetOnClear => write!(f, "reset_on_clear"),
            WatermarkPolicy::Sticky => write!(f, "sticky"),
        }
    }
}

impl std::str::FromStr for WatermarkPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "reset_on_clear" => Ok(WatermarkPolicy::ResetOnClear),
            "sticky" => Ok(WatermarkPolicy::Sticky),
            other => Err(format!("unknown watermark policy: {other}")),
        }
    }
}
