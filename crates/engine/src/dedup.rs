//! Dedup gate: persisted watermark that suppresses repeat notifications.
//!
//! The watermark is the last pending count a notification was issued for. A
//! new notification is only warranted when the count strictly exceeds it, so
//! the same pending items persisting across polls never re-notify.
//!
//! Check-then-write runs under an async mutex. Overlapping triggers (a periodic
//! tick racing a push-driven poll) therefore cannot both read the same old
//! watermark. Share one gate per store.

use std::sync::Arc;

use tokio::sync::Mutex;

use cubstars_common::store::{KeyValueStore, SettingKey};

pub struct DedupGate<S> {
    store: Arc<S>,
    lock: Mutex<()>,
}

impl<S: KeyValueStore> DedupGate<S> {
    pub fn new(store: Arc<S>) -> Self {
        Self {
            store,
            lock: Mutex::new(()),
        }
    }

    /// Decide whether `new_count` warrants a notification.
    ///
    /// Returns `true` iff `new_count > 0` and it strictly exceeds the stored
    /// watermark; in that case the watermark is advanced to `new_count` before
    /// returning. A zero count never notifies and leaves the watermark alone.
    pub async fn should_notify(&self, new_count: u64) -> bool {
        if new_count == 0 {
            return false;
        }

        let _guard = self.lock.lock().await;
        let last_notified = self.store.get(SettingKey::LastNotifiedCount, 0u64).await;

        if new_count <= last_notified {
            tracing::debug!(
                new_count,
                last_notified,
                "Notification suppressed, count has not increased"
            );
            return false;
        }

        self.store.put(SettingKey::LastNotifiedCount, &new_count).await;
        true
    }

    /// Reset the watermark to 0 so the next nonzero count notifies again.
    pub async fn clear(&self) {
        let _guard = self.lock.lock().await;
        let last_notified = self.store.get(SettingKey::LastNotifiedCount, 0u64).await;

        if last_notified != 0 {
            self.store.put(SettingKey::LastNotifiedCount, &0u64).await;
            tracing::info!(last_notified, "Pending approvals cleared, watermark reset");
        }
    }

    /// Current watermark as seen by the store (0 when unset or unreadable).
    pub async fn watermark(&self) -> u64 {
        self.store.get(SettingKey::LastNotifiedCount, 0u64).await
    }
}
