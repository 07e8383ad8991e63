// File: wardenbot-core/src/tasks/maintenance.rs

use std::sync::Arc;
use chrono::Utc;
use tokio::task::JoinHandle;
use tracing::{debug, error};

use wardenbot_common::error::Error;
use wardenbot_common::traits::repository_traits::{RateWindowStore, VerificationRepository};

/// One maintenance pass: bulk-expire overdue pending challenges and drop
/// dead rate windows. Correctness does not depend on this running —
/// expiry is also transitioned on read — it just keeps the store tidy.
pub async fn run_maintenance(
    verification_repo: &Arc<dyn VerificationRepository + Send + Sync>,
    rate_store: &Arc<dyn RateWindowStore + Send + Sync>,
) -> Result<(u64, u64), Error> {
    let now = Utc::now();
    let expired = verification_repo.expire_overdue(now).await?;
    let swept = rate_store.sweep(now).await?;
    if expired > 0 || swept > 0 {
        debug!("maintenance: expired {} challenges, swept {} windows", expired, swept);
    }
    Ok((expired, swept))
}

/// Spawns the periodic maintenance loop.
pub fn spawn_maintenance_loop(
    verification_repo: Arc<dyn VerificationRepository + Send + Sync>,
    rate_store: Arc<dyn RateWindowStore + Send + Sync>,
    interval_s: u64,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(std::time::Duration::from_secs(interval_s));
        loop {
            ticker.tick().await;
            if let Err(e) = run_maintenance(&verification_repo, &rate_store).await {
                error!("maintenance pass failed: {:?}", e);
            }
        }
    })
}
