use sqlx::PgPool;

use crate::configuration::PurgeSettings;
use crate::repository::members::purge_expired_members;

/// Periodically removes accounts whose deletion grace period has run out.
/// Runs for the lifetime of the server; individual tick failures are logged
/// and the loop carries on.
pub async fn run_purge_worker(pool: PgPool, settings: PurgeSettings) {
    let period = std::time::Duration::from_secs(settings.run_interval_seconds);
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
    // the first tick fires immediately; skip it so a crash-looping server
    // does not hammer the delete on every restart
    ticker.tick().await;

    loop {
        ticker.tick().await;
        purge_tick(&pool, settings.grace_period_days).await;
    }
}

#[tracing::instrument(name = "Purge expired members", skip(pool))]
async fn purge_tick(pool: &PgPool, grace_period_days: i64) {
    match purge_expired_members(pool, grace_period_days).await {
        Ok(0) => {
            tracing::debug!("no expired member accounts to purge");
        }
        Ok(purged) => {
            tracing::info!(purged, "removed expired member accounts");
        }
        Err(e) => {
            tracing::error!(error.cause_chain = ?e, "failed to purge expired member accounts");
        }
    }
}
