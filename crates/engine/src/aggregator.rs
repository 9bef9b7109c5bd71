//! Approval aggregator: folds a status snapshot into a pending-approvals summary.

use cubstars_common::types::{PendingSummary, PreviewItem, StatusSnapshot};

/// Maximum number of `(child, task)` pairs shown in a notification body.
pub const MAX_PREVIEW_ITEMS: usize = 3;

pub struct ApprovalAggregator;

impl ApprovalAggregator {
    /// Count every pending approval across children, in encounter order.
    ///
    /// No sorting and no deduplication: identical task names on different
    /// children each count.
    pub fn summarize(snapshot: &StatusSnapshot) -> PendingSummary {
        let mut total_count = 0u64;
        let mut preview_items = Vec::with_capacity(MAX_PREVIEW_ITEMS);
        let mut candidates = 0usize;

        for child in &snapshot.children {
            total_count += child.pending_approvals.len() as u64;

            for approval in &child.pending_approvals {
                candidates += 1;
                if preview_items.len() < MAX_PREVIEW_ITEMS {
                    preview_items.push(PreviewItem {
                        child_name: child.name.clone(),
                        task_name: approval.task_name.clone(),
                    });
                }
            }
        }

        PendingSummary {
            total_count,
            preview_items,
            truncated: candidates > MAX_PREVIEW_ITEMS,
        }
    }
}
