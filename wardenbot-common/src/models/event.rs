// File: wardenbot-common/src/models/event.rs

use serde::{Deserialize, Serialize};

/// Classification assigned by the transport layer before an event reaches
/// the pipeline.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Text,
    Command,
    Join,
    Leave,
    AnswerCallback,
    PrivateAnswer,
}

/// Classified inbound event envelope, as delivered by the transport layer.
#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct InboundEvent {
    pub kind: EventKind,
    /// Platform chat identifier of the room; absent for private answers.
    pub platform_chat_id: Option<String>,
    pub member_id: String,
    /// Platform message id of the triggering message, when there is one.
    pub message_id: Option<String>,
    pub text: Option<String>,
    /// Button payload for `AnswerCallback` events.
    pub callback_token: Option<String>,
}

impl InboundEvent {
    pub fn text(platform_chat_id: &str, member_id: &str, message_id: &str, text: &str) -> Self {
        Self {
            kind: EventKind::Text,
            platform_chat_id: Some(platform_chat_id.to_string()),
            member_id: member_id.to_string(),
            message_id: Some(message_id.to_string()),
            text: Some(text.to_string()),
            callback_token: None,
        }
    }

    pub fn join(platform_chat_id: &str, member_id: &str) -> Self {
        Self {
            kind: EventKind::Join,
            platform_chat_id: Some(platform_chat_id.to_string()),
            member_id: member_id.to_string(),
            message_id: None,
            text: None,
            callback_token: None,
        }
    }

    pub fn leave(platform_chat_id: &str, member_id: &str) -> Self {
        Self {
            kind: EventKind::Leave,
            platform_chat_id: Some(platform_chat_id.to_string()),
            member_id: member_id.to_string(),
            message_id: None,
            text: None,
            callback_token: None,
        }
    }

    pub fn answer_callback(platform_chat_id: &str, member_id: &str, callback_token: &str) -> Self {
        Self {
            kind: EventKind::AnswerCallback,
            platform_chat_id: Some(platform_chat_id.to_string()),
            member_id: member_id.to_string(),
            message_id: None,
            text: None,
            callback_token: Some(callback_token.to_string()),
        }
    }

    pub fn private_answer(member_id: &str, text: &str) -> Self {
        Self {
            kind: EventKind::PrivateAnswer,
            platform_chat_id: None,
            member_id: member_id.to_string(),
            message_id: None,
            text: Some(text.to_string()),
            callback_token: None,
        }
    }
}

/// Terminal outcome of running one event through the pipeline. Exactly one
/// tag is produced per event; no two checks fire for the same event.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub enum PipelineOutcome {
    CommandDispatched,
    RoutedToVerification,
    PolicyBlocked,
    AutoReplied,
    SpamBlocked,
    PassedThrough,
    /// Room or config could not be resolved; the event is acknowledged and
    /// dropped rather than treated as a failure.
    Ignored,
}
