// File: wardenbot-common/src/models/auto_reply.rs

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::message::Keyboard;

/// How a rule's keyword is compared against message text. All modes except
/// `Regex` compare lowercased text against the lowercased keyword; `Regex`
/// tests the raw text with a case-insensitive pattern.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MatchMode {
    Exact,
    Contains,
    Prefix,
    Suffix,
    Regex,
}

/// What an auto-reply rule sends when it fires.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ReplyContent {
    Text { body: String },
    Image { url: String, caption: Option<String> },
    Link { url: String, label: String },
    Buttons { body: String, keyboard: Keyboard },
}

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct AutoReplyRule {
    pub rule_id: Uuid,
    pub keyword: String,
    pub match_mode: MatchMode,
    /// Selection weight among multiple matching rules; minimum 1.
    #[serde(default = "default_weight")]
    pub weight: u32,
    pub response: ReplyContent,
    /// Delete the triggering message after `delete_delay_s` (or immediately
    /// when no delay is configured).
    #[serde(default)]
    pub delete_trigger: bool,
    #[serde(default)]
    pub delete_delay_s: Option<i64>,
    /// Bookkeeping maintained outside the core; read here only as the
    /// deterministic iteration tie-break.
    #[serde(default)]
    pub usage_count: i64,
}

fn default_weight() -> u32 {
    1
}

impl AutoReplyRule {
    pub fn text(keyword: &str, match_mode: MatchMode, body: &str) -> Self {
        Self {
            rule_id: Uuid::new_v4(),
            keyword: keyword.to_string(),
            match_mode,
            weight: 1,
            response: ReplyContent::Text { body: body.to_string() },
            delete_trigger: false,
            delete_delay_s: None,
            usage_count: 0,
        }
    }
}
