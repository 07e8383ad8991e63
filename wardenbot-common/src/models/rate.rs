// File: wardenbot-common/src/models/rate.rs

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// One remembered message in a (room, member) rate window. The fingerprint
/// is the lowercased, trimmed message text used for duplicate detection.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct RateEntry {
    pub sent_at: DateTime<Utc>,
    pub fingerprint: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum SpamReason {
    Frequency,
    Duplicate,
    None,
}

/// Result of one spam-guard check.
#[derive(Debug, Clone, PartialEq)]
pub struct SpamVerdict {
    pub is_spam: bool,
    pub reason: SpamReason,
    pub confidence: f32,
}

impl SpamVerdict {
    pub fn clean() -> Self {
        Self {
            is_spam: false,
            reason: SpamReason::None,
            confidence: 0.0,
        }
    }
}
