// File: wardenbot-core/src/services/spam_guard.rs

use std::sync::Arc;
use chrono::{Duration, Utc};
use tracing::debug;
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::policy::SpamPolicy;
use wardenbot_common::models::rate::{RateEntry, SpamReason, SpamVerdict};
use wardenbot_common::traits::repository_traits::RateWindowStore;

/// Normalized message fingerprint used for duplicate detection.
pub fn fingerprint(text: &str) -> String {
    text.trim().to_lowercase()
}

/// Sliding-window rate/duplicate guard over a pluggable TTL store. State is
/// keyed by (room, member); unrelated pairs never contend.
pub struct SpamGuard {
    store: Arc<dyn RateWindowStore + Send + Sync>,
}

impl SpamGuard {
    pub fn new(store: Arc<dyn RateWindowStore + Send + Sync>) -> Self {
        Self { store }
    }

    /// Classifies the current message and records it in the window. The
    /// frequency check runs before the duplicate check; a message tripping
    /// both reports `frequency`.
    pub async fn check(
        &self,
        room_id: Uuid,
        member_id: &str,
        text: &str,
        policy: &SpamPolicy,
    ) -> Result<SpamVerdict, Error> {
        let now = Utc::now();
        let window = Duration::seconds(policy.time_window_s);
        let cutoff = now - window;

        let mut entries = self.store.fetch(room_id, member_id).await?;
        entries.retain(|e| e.sent_at > cutoff);

        let normalized = fingerprint(text);
        let message_count = entries.len() + 1;
        let duplicate_count = entries
            .iter()
            .filter(|e| e.fingerprint == normalized)
            .count()
            + 1;

        entries.push(RateEntry {
            sent_at: now,
            fingerprint: normalized,
        });
        self.store.store(room_id, member_id, &entries, window).await?;

        if policy.max_messages > 0 && message_count >= policy.max_messages {
            debug!(
                "frequency spam from {} in {}: {} messages in {}s",
                member_id, room_id, message_count, policy.time_window_s
            );
            return Ok(SpamVerdict {
                is_spam: true,
                reason: SpamReason::Frequency,
                confidence: (message_count as f32 / policy.max_messages as f32).min(1.0),
            });
        }

        if policy.duplicate_threshold > 0 && duplicate_count >= policy.duplicate_threshold {
            debug!(
                "duplicate spam from {} in {}: {} repeats",
                member_id, room_id, duplicate_count
            );
            return Ok(SpamVerdict {
                is_spam: true,
                reason: SpamReason::Duplicate,
                confidence: (duplicate_count as f32 / policy.duplicate_threshold as f32).min(1.0),
            });
        }

        Ok(SpamVerdict::clean())
    }
}
