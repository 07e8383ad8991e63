// File: wardenbot-core/src/services/pipeline_service.rs

use std::sync::Arc;
use chrono::Duration;
use tracing::{debug, info, warn};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::auto_reply::AutoReplyRule;
use wardenbot_common::models::event::{EventKind, InboundEvent, PipelineOutcome};
use wardenbot_common::models::room::Room;
use wardenbot_common::traits::platform_traits::{
    ChatPlatform, CommandSink, ContentPolicy, PointsSink,
};
use wardenbot_common::traits::repository_traits::{
    PolicyProvider, PolicyRepository, RoomRepository,
};

use crate::services::auto_reply_service::AutoReplyService;
use crate::services::enforcement;
use crate::services::spam_guard::SpamGuard;
use crate::services::verification_service::VerificationService;

/// Pipeline knobs that are not per-room policy.
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Messages starting with this prefix are dispatched to external
    /// command handling before any other check.
    pub command_prefix: String,
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self {
            command_prefix: "/".to_string(),
        }
    }
}

/// The pipeline entry point. Each inbound event is classified and, for
/// plain text, run through the checks in a fixed order with short-circuit:
/// command dispatch, pending verification, content policy, auto-reply, spam
/// guard, points hand-off. Exactly one outcome tag per event; no two checks
/// fire for the same event.
pub struct EventPipelineService {
    room_repo: Arc<dyn RoomRepository + Send + Sync>,
    policy_provider: Arc<dyn PolicyProvider + Send + Sync>,
    policy_repo: Arc<dyn PolicyRepository + Send + Sync>,
    verification: Arc<VerificationService>,
    spam_guard: Arc<SpamGuard>,
    auto_reply: AutoReplyService,
    platform: Arc<dyn ChatPlatform + Send + Sync>,
    content_policy: Arc<dyn ContentPolicy + Send + Sync>,
    command_sink: Arc<dyn CommandSink + Send + Sync>,
    points_sink: Arc<dyn PointsSink + Send + Sync>,
    settings: PipelineSettings,
}

impl EventPipelineService {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        room_repo: Arc<dyn RoomRepository + Send + Sync>,
        policy_provider: Arc<dyn PolicyProvider + Send + Sync>,
        policy_repo: Arc<dyn PolicyRepository + Send + Sync>,
        verification: Arc<VerificationService>,
        spam_guard: Arc<SpamGuard>,
        platform: Arc<dyn ChatPlatform + Send + Sync>,
        content_policy: Arc<dyn ContentPolicy + Send + Sync>,
        command_sink: Arc<dyn CommandSink + Send + Sync>,
        points_sink: Arc<dyn PointsSink + Send + Sync>,
        settings: PipelineSettings,
    ) -> Self {
        debug!("EventPipelineService::new()");
        Self {
            room_repo,
            policy_provider,
            policy_repo,
            verification,
            spam_guard,
            auto_reply: AutoReplyService::new(),
            platform,
            content_policy,
            command_sink,
            points_sink,
            settings,
        }
    }

    /// Processes one classified event to its terminal outcome. Never raises
    /// past this boundary for per-check conditions — only store/platform
    /// failures surface as errors, and the caller should acknowledge the
    /// event to its source either way.
    pub async fn process_event(&self, event: &InboundEvent) -> Result<PipelineOutcome, Error> {
        match event.kind {
            EventKind::Text => self.process_text(event).await,
            EventKind::Command => {
                let Some(room) = self.resolve_room(event).await? else {
                    return Ok(PipelineOutcome::Ignored);
                };
                let text = event.text.as_deref().unwrap_or_default();
                self.command_sink
                    .dispatch(room.room_id, &event.member_id, text)
                    .await?;
                Ok(PipelineOutcome::CommandDispatched)
            }
            EventKind::Join => {
                let Some(room) = self.resolve_room(event).await? else {
                    return Ok(PipelineOutcome::Ignored);
                };
                let config = self.policy_provider.get_policy_config(room.room_id).await?;
                let issued = self
                    .verification
                    .handle_join(&room, &event.member_id, &config.verification)
                    .await?;
                if issued.is_some() {
                    Ok(PipelineOutcome::RoutedToVerification)
                } else {
                    Ok(PipelineOutcome::PassedThrough)
                }
            }
            EventKind::Leave => {
                let Some(room) = self.resolve_room(event).await? else {
                    return Ok(PipelineOutcome::Ignored);
                };
                self.verification
                    .handle_leave(room.room_id, &event.member_id)
                    .await?;
                Ok(PipelineOutcome::PassedThrough)
            }
            EventKind::AnswerCallback => {
                let Some(token) = event.callback_token.as_deref() else {
                    debug!("answer_callback event without token");
                    return Ok(PipelineOutcome::Ignored);
                };
                self.verification
                    .handle_callback(&event.member_id, token)
                    .await?;
                Ok(PipelineOutcome::RoutedToVerification)
            }
            EventKind::PrivateAnswer => {
                let text = event.text.as_deref().unwrap_or_default();
                self.verification
                    .answer_private(&event.member_id, text)
                    .await?;
                Ok(PipelineOutcome::RoutedToVerification)
            }
        }
    }

    async fn process_text(&self, event: &InboundEvent) -> Result<PipelineOutcome, Error> {
        let Some(room) = self.resolve_room(event).await? else {
            return Ok(PipelineOutcome::Ignored);
        };
        let text = event.text.as_deref().unwrap_or_default();

        // 1) Reserved command prefix wins before anything else.
        if !self.settings.command_prefix.is_empty()
            && text.trim_start().starts_with(&self.settings.command_prefix)
        {
            self.command_sink
                .dispatch(room.room_id, &event.member_id, text)
                .await?;
            return Ok(PipelineOutcome::CommandDispatched);
        }

        // 2) A pending challenge consumes the message exclusively; spam and
        //    auto-reply never see it.
        if let Some(record) = self
            .verification
            .pending_record(room.room_id, &event.member_id)
            .await?
        {
            self.verification.answer_record(&record, text).await?;
            return Ok(PipelineOutcome::RoutedToVerification);
        }

        let config = self.policy_provider.get_policy_config(room.room_id).await?;

        // 3) Opaque content-policy predicate.
        if let Some(violation) = self
            .content_policy
            .review(room.room_id, &event.member_id, text)
            .await?
        {
            info!(
                "content violation '{}' by {} in {}",
                violation.rule, event.member_id, room.room_id
            );
            let notice = format!(
                "Message from {} removed ({}): {}",
                event.member_id, violation.rule, violation.punishment
            );
            enforcement::apply_punishment(
                &self.platform,
                room.room_id,
                &event.member_id,
                event.message_id.as_deref(),
                &violation.punishment,
                &notice,
            )
            .await?;
            return Ok(PipelineOutcome::PolicyBlocked);
        }

        // 4) Auto-reply.
        if let Some(rule) = self.auto_reply.match_rule(text, &config.auto_reply.rules) {
            self.fire_auto_reply(&room, event, rule).await;
            return Ok(PipelineOutcome::AutoReplied);
        }

        // 5) Spam guard.
        if config.spam.enabled {
            let verdict = self
                .spam_guard
                .check(room.room_id, &event.member_id, text, &config.spam)
                .await?;
            if verdict.is_spam {
                let notice = format!(
                    "Spam from {} ({:?}, confidence {:.2}): action {}.",
                    event.member_id, verdict.reason, verdict.confidence, config.spam.punishment
                );
                enforcement::apply_punishment(
                    &self.platform,
                    room.room_id,
                    &event.member_id,
                    event.message_id.as_deref(),
                    &config.spam.punishment,
                    &notice,
                )
                .await?;
                return Ok(PipelineOutcome::SpamBlocked);
            }
        }

        // 6) Hand off to the points collaborator without waiting on it.
        let points = self.points_sink.clone();
        let room_id = room.room_id;
        let member_id = event.member_id.clone();
        let text_owned = text.to_string();
        tokio::spawn(async move {
            if let Err(e) = points.award_activity(room_id, &member_id, &text_owned).await {
                warn!("points hand-off failed for {}: {:?}", member_id, e);
            }
        });

        Ok(PipelineOutcome::PassedThrough)
    }

    async fn fire_auto_reply(&self, room: &Room, event: &InboundEvent, rule: &AutoReplyRule) {
        debug!(
            "auto-reply rule {} fired for {} in {}",
            rule.rule_id, event.member_id, room.room_id
        );
        if let Err(e) = self.platform.send_reply(room.room_id, &rule.response).await {
            warn!("failed to send auto-reply in {}: {:?}", room.room_id, e);
        }

        // Usage bookkeeping is a side effect, not part of the decision.
        let policy_repo = self.policy_repo.clone();
        let room_id = room.room_id;
        let rule_id = rule.rule_id;
        tokio::spawn(async move {
            if let Err(e) = policy_repo.increment_rule_usage(room_id, rule_id).await {
                warn!("failed to bump usage for rule {}: {:?}", rule_id, e);
            }
        });

        if rule.delete_trigger {
            if let Some(message_id) = event.message_id.clone() {
                self.schedule_trigger_deletion(room.room_id, message_id, rule.delete_delay_s)
                    .await;
            }
        }
    }

    async fn schedule_trigger_deletion(
        &self,
        room_id: Uuid,
        message_id: String,
        delay_s: Option<i64>,
    ) {
        match delay_s {
            Some(secs) if secs > 0 => {
                let platform = self.platform.clone();
                tokio::spawn(async move {
                    tokio::time::sleep(
                        Duration::seconds(secs).to_std().unwrap_or_default(),
                    )
                    .await;
                    if let Err(e) = platform.delete_message(room_id, &message_id).await {
                        warn!("delayed delete of {} in {} failed: {:?}", message_id, room_id, e);
                    }
                });
            }
            _ => {
                if let Err(e) = self.platform.delete_message(room_id, &message_id).await {
                    warn!("failed to delete trigger {} in {}: {:?}", message_id, room_id, e);
                }
            }
        }
    }

    /// Rooms or configs that cannot be resolved mean "ignore this event";
    /// rooms can be legitimately unregistered.
    async fn resolve_room(&self, event: &InboundEvent) -> Result<Option<Room>, Error> {
        let Some(chat_id) = event.platform_chat_id.as_deref() else {
            debug!("event without platform chat id");
            return Ok(None);
        };
        let room = self.room_repo.get_room_by_chat_id(chat_id).await?;
        match room {
            Some(r) if r.is_active => Ok(Some(r)),
            Some(r) => {
                debug!("room {} is inactive", r.room_id);
                Ok(None)
            }
            None => {
                debug!("no room registered for chat id {}", chat_id);
                Ok(None)
            }
        }
    }
}
