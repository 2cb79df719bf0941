//! Scheduled background tasks using tokio-cron-scheduler.
//!
//! Periodic maintenance that keeps the market's time-bound state honest:
//! - Expire purchase intents past their deadline (every minute)
//! - Evict expired CAPTCHA challenges (every minute)
//! - Prune payment dedup records past retention (daily)
//!
//! Sweeps commit through the same guards as user traffic.

use anyhow::Result;
use chrono::Utc;
use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use super::{ChallengeStore, Market};

/// Start all scheduled tasks
pub async fn start_scheduler(market: Market, challenges: Arc<ChallengeStore>) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let expiry_market = market.clone();
    let expiry_job = Job::new_async("0 * * * * *", move |_uuid, _lock| {
        let market = expiry_market.clone();
        Box::pin(async move {
            if let Err(e) = market.sweep_expired(Utc::now()).await {
                tracing::error!("Intent expiry sweep failed: {}", e);
            }
        })
    })?;
    scheduler.add(expiry_job).await?;

    let captcha_job = Job::new_async("30 * * * * *", move |_uuid, _lock| {
        let challenges = challenges.clone();
        Box::pin(async move {
            let evicted = challenges.sweep_expired(Utc::now()).await;
            if evicted > 0 {
                tracing::debug!(evicted, "Evicted expired CAPTCHA challenges");
            }
        })
    })?;
    scheduler.add(captcha_job).await?;

    let prune_market = market.clone();
    let prune_job = Job::new_async("0 15 3 * * *", move |_uuid, _lock| {
        let market = prune_market.clone();
        Box::pin(async move {
            if let Err(e) = market.prune_processed(Utc::now()).await {
                tracing::error!("Payment dedup pruning failed: {}", e);
            }
        })
    })?;
    scheduler.add(prune_job).await?;

    scheduler.start().await?;

    tracing::info!(
        "Scheduled tasks started (intent expiry and CAPTCHA eviction every minute, dedup pruning daily)"
    );
    Ok(scheduler)
}
