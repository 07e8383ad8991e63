// File: wardenbot-core/src/services/enforcement.rs

use std::sync::Arc;
use chrono::{Duration, Utc};
use tracing::{info, warn};
use uuid::Uuid;

use wardenbot_common::error::Error;
use wardenbot_common::models::policy::Punishment;
use wardenbot_common::traits::platform_traits::ChatPlatform;

/// Applies a configured punishment. Every path first attempts to delete the
/// triggering message; a failed delete never aborts the remaining steps, and
/// platform failures are logged rather than propagated.
pub async fn apply_punishment(
    platform: &Arc<dyn ChatPlatform + Send + Sync>,
    room_id: Uuid,
    member_id: &str,
    message_id: Option<&str>,
    punishment: &Punishment,
    notice: &str,
) -> Result<(), Error> {
    if let Some(mid) = message_id {
        if let Err(e) = platform.delete_message(room_id, mid).await {
            warn!("failed to delete message {} in {}: {:?}", mid, room_id, e);
        }
    }

    match punishment {
        Punishment::Delete => {
            // Message removal only; no notice.
        }
        Punishment::Warn => {
            if let Err(e) = platform.send_message(room_id, notice, None).await {
                warn!("failed to post warning in {}: {:?}", room_id, e);
            }
        }
        Punishment::Mute { duration_s } => {
            let until = Utc::now() + Duration::seconds(*duration_s);
            if let Err(e) = platform.restrict_member(room_id, member_id, Some(until)).await {
                warn!("failed to mute {} in {}: {:?}", member_id, room_id, e);
            }
            post_notice(platform, room_id, notice).await;
        }
        Punishment::Kick => {
            if let Err(e) = platform.remove_member(room_id, member_id, false).await {
                warn!("failed to kick {} from {}: {:?}", member_id, room_id, e);
            }
            post_notice(platform, room_id, notice).await;
        }
        Punishment::Ban => {
            if let Err(e) = platform.remove_member(room_id, member_id, true).await {
                warn!("failed to ban {} from {}: {:?}", member_id, room_id, e);
            }
            post_notice(platform, room_id, notice).await;
        }
    }

    info!(
        "applied punishment {} to member {} in room {}",
        punishment, member_id, room_id
    );
    Ok(())
}

async fn post_notice(platform: &Arc<dyn ChatPlatform + Send + Sync>, room_id: Uuid, notice: &str) {
    if let Err(e) = platform.send_message(room_id, notice, None).await {
        warn!("failed to post notice in {}: {:?}", room_id, e);
    }
}
