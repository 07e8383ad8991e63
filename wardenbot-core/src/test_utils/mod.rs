// File: wardenbot-core/src/test_utils/mod.rs
//
// Shared stubs for exercising the pipeline without a platform or a real
// store behind it.

use std::sync::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::auto_reply::ReplyContent;
use wardenbot_common::models::message::Keyboard;
use wardenbot_common::models::room::Room;
use wardenbot_common::traits::platform_traits::{
    ChatPlatform, CommandSink, ContentPolicy, ContentViolation, MembershipStatus, PointsSink,
};

pub fn sample_room(platform_chat_id: &str) -> Room {
    Room::new(platform_chat_id, "Test Room")
}

#[derive(Debug, Clone, PartialEq)]
pub enum PlatformCall {
    SendMessage {
        room_id: Uuid,
        text: String,
        has_keyboard: bool,
    },
    SendReply {
        room_id: Uuid,
        content: ReplyContent,
    },
    DeleteMessage {
        room_id: Uuid,
        message_id: String,
    },
    Restrict {
        room_id: Uuid,
        member_id: String,
        until: Option<DateTime<Utc>>,
    },
    Unrestrict {
        room_id: Uuid,
        member_id: String,
    },
    Remove {
        room_id: Uuid,
        member_id: String,
        permanent: bool,
    },
    QueryMembership {
        channel_ref: String,
        member_id: String,
    },
}

/// ChatPlatform stub that records every call and answers membership probes
/// with a configurable status.
pub struct RecordingPlatform {
    calls: Mutex<Vec<PlatformCall>>,
    membership_status: Mutex<MembershipStatus>,
    next_message_id: AtomicU64,
}

impl RecordingPlatform {
    pub fn new() -> Self {
        Self {
            calls: Mutex::new(Vec::new()),
            membership_status: Mutex::new(MembershipStatus::Unknown),
            next_message_id: AtomicU64::new(1),
        }
    }

    pub fn set_membership(&self, status: MembershipStatus) {
        *self.membership_status.lock().unwrap() = status;
    }

    pub fn calls(&self) -> Vec<PlatformCall> {
        self.calls.lock().unwrap().clone()
    }

    pub fn sent_texts(&self) -> Vec<String> {
        self.calls()
            .into_iter()
            .filter_map(|c| match c {
                PlatformCall::SendMessage { text, .. } => Some(text),
                _ => None,
            })
            .collect()
    }

    fn record(&self, call: PlatformCall) {
        self.calls.lock().unwrap().push(call);
    }
}

impl Default for RecordingPlatform {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ChatPlatform for RecordingPlatform {
    async fn send_message(
        &self,
        room_id: Uuid,
        text: &str,
        keyboard: Option<&Keyboard>,
    ) -> Result<Option<String>, Error> {
        self.record(PlatformCall::SendMessage {
            room_id,
            text: text.to_string(),
            has_keyboard: keyboard.is_some(),
        });
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("msg-{}", id)))
    }

    async fn send_reply(
        &self,
        room_id: Uuid,
        content: &ReplyContent,
    ) -> Result<Option<String>, Error> {
        self.record(PlatformCall::SendReply {
            room_id,
            content: content.clone(),
        });
        let id = self.next_message_id.fetch_add(1, Ordering::SeqCst);
        Ok(Some(format!("msg-{}", id)))
    }

    async fn delete_message(&self, room_id: Uuid, message_id: &str) -> Result<(), Error> {
        self.record(PlatformCall::DeleteMessage {
            room_id,
            message_id: message_id.to_string(),
        });
        Ok(())
    }

    async fn restrict_member(
        &self,
        room_id: Uuid,
        member_id: &str,
        until: Option<DateTime<Utc>>,
    ) -> Result<(), Error> {
        self.record(PlatformCall::Restrict {
            room_id,
            member_id: member_id.to_string(),
            until,
        });
        Ok(())
    }

    async fn unrestrict_member(&self, room_id: Uuid, member_id: &str) -> Result<(), Error> {
        self.record(PlatformCall::Unrestrict {
            room_id,
            member_id: member_id.to_string(),
        });
        Ok(())
    }

    async fn remove_member(
        &self,
        room_id: Uuid,
        member_id: &str,
        permanent: bool,
    ) -> Result<(), Error> {
        self.record(PlatformCall::Remove {
            room_id,
            member_id: member_id.to_string(),
            permanent,
        });
        Ok(())
    }

    async fn query_membership(
        &self,
        channel_ref: &str,
        member_id: &str,
    ) -> Result<MembershipStatus, Error> {
        self.record(PlatformCall::QueryMembership {
            channel_ref: channel_ref.to_string(),
            member_id: member_id.to_string(),
        });
        Ok(*self.membership_status.lock().unwrap())
    }
}

/// Content policy stub that flags nothing, or everything with a fixed
/// violation.
pub struct StaticContentPolicy {
    violation: Option<ContentViolation>,
}

impl StaticContentPolicy {
    pub fn clean() -> Self {
        Self { violation: None }
    }

    pub fn flagging(violation: ContentViolation) -> Self {
        Self {
            violation: Some(violation),
        }
    }
}

#[async_trait]
impl ContentPolicy for StaticContentPolicy {
    async fn review(
        &self,
        _room_id: Uuid,
        _member_id: &str,
        _text: &str,
    ) -> Result<Option<ContentViolation>, Error> {
        Ok(self.violation.clone())
    }
}

#[derive(Default)]
pub struct RecordingCommandSink {
    pub dispatched: Mutex<Vec<(Uuid, String, String)>>,
}

impl RecordingCommandSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl CommandSink for RecordingCommandSink {
    async fn dispatch(&self, room_id: Uuid, member_id: &str, text: &str) -> Result<(), Error> {
        self.dispatched
            .lock()
            .unwrap()
            .push((room_id, member_id.to_string(), text.to_string()));
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPointsSink {
    pub awards: Mutex<Vec<(Uuid, String)>>,
}

impl RecordingPointsSink {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl PointsSink for RecordingPointsSink {
    async fn award_activity(
        &self,
        room_id: Uuid,
        member_id: &str,
        _text: &str,
    ) -> Result<(), Error> {
        self.awards
            .lock()
            .unwrap()
            .push((room_id, member_id.to_string()));
        Ok(())
    }
}
