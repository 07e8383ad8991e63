// File: wardenbot-common/src/models/policy.rs

use std::fmt;
use std::str::FromStr;
use serde::{Deserialize, Serialize};

use crate::models::auto_reply::AutoReplyRule;

/// Per-room settings bundle. The core sees this as an immutable snapshot for
/// the duration of one event's processing; edits happen elsewhere and reach
/// the core through the policy provider's read-through cache.
#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct PolicyConfig {
    #[serde(default)]
    pub verification: VerificationPolicy,
    #[serde(default)]
    pub spam: SpamPolicy,
    #[serde(default)]
    pub auto_reply: AutoReplyPolicy,
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct VerificationPolicy {
    pub enabled: bool,
    pub challenge_type: ChallengeType,
    /// Seconds before a pending challenge expires.
    pub timeout_s: i64,
    pub max_attempts: i32,
    #[serde(default)]
    pub bypass_member_ids: Vec<String>,
    /// Target channel for membership-type challenges.
    #[serde(default)]
    pub membership_channel: Option<String>,
    /// Safety-net posting restriction applied at issuance. Deliberately a
    /// separate knob from `timeout_s`; must be at least as long.
    #[serde(default = "default_restrict_safety_s")]
    pub restrict_safety_s: i64,
}

fn default_restrict_safety_s() -> i64 {
    86_400
}

impl Default for VerificationPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            challenge_type: ChallengeType::Code,
            timeout_s: 300,
            max_attempts: 3,
            bypass_member_ids: Vec::new(),
            membership_channel: None,
            restrict_safety_s: default_restrict_safety_s(),
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct SpamPolicy {
    pub enabled: bool,
    pub time_window_s: i64,
    pub max_messages: usize,
    pub duplicate_threshold: usize,
    pub punishment: Punishment,
}

impl Default for SpamPolicy {
    fn default() -> Self {
        Self {
            enabled: false,
            time_window_s: 10,
            max_messages: 5,
            duplicate_threshold: 3,
            punishment: Punishment::Delete,
        }
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, Default)]
pub struct AutoReplyPolicy {
    #[serde(default)]
    pub rules: Vec<AutoReplyRule>,
}

/// Configured action taken when a message trips the spam guard or the
/// content-policy predicate. Every variant first attempts to delete the
/// triggering message (best-effort).
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "action", rename_all = "lowercase")]
pub enum Punishment {
    Delete,
    Warn,
    Mute { duration_s: i64 },
    Kick,
    Ban,
}

impl fmt::Display for Punishment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Punishment::Delete => write!(f, "delete"),
            Punishment::Warn => write!(f, "warn"),
            Punishment::Mute { .. } => write!(f, "mute"),
            Punishment::Kick => write!(f, "kick"),
            Punishment::Ban => write!(f, "ban"),
        }
    }
}

/// Which kind of challenge a room issues to newly joined members.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq, Hash, sqlx::Type)]
#[sqlx(type_name = "TEXT")]
#[sqlx(rename_all = "kebab-case")]
#[serde(rename_all = "kebab-case")]
pub enum ChallengeType {
    Membership,
    Code,
    Arithmetic,
    MediaCaption,
    Deferred,
}

impl fmt::Display for ChallengeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ChallengeType::Membership => write!(f, "membership"),
            ChallengeType::Code => write!(f, "code"),
            ChallengeType::Arithmetic => write!(f, "arithmetic"),
            ChallengeType::MediaCaption => write!(f, "media-caption"),
            ChallengeType::Deferred => write!(f, "deferred"),
        }
    }
}

impl FromStr for ChallengeType {
    type Err = String;
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "membership" => Ok(ChallengeType::Membership),
            "code" => Ok(ChallengeType::Code),
            "arithmetic" => Ok(ChallengeType::Arithmetic),
            "media-caption" => Ok(ChallengeType::MediaCaption),
            "deferred" => Ok(ChallengeType::Deferred),
            _ => Err(format!("Unknown challenge type: {}", s)),
        }
    }
}
