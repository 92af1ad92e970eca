//! `schedule` command: recurring scrape runs on a cron expression.

use std::sync::Arc;

use offerdb_core::AppConfig;
use sqlx::PgPool;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::scrape;

/// Registers the scrape job, starts the scheduler and blocks until Ctrl-C.
///
/// # Errors
///
/// Returns an error if the cron expression is invalid or the scheduler
/// cannot be started or stopped.
pub(crate) async fn run_schedule(pool: PgPool, config: Arc<AppConfig>) -> anyhow::Result<()> {
    let mut scheduler = JobScheduler::new().await?;

    let cron = config.scrape_cron.clone();
    let job = Job::new_async(cron.as_str(), move |_uuid, _lock| {
        let pool = pool.clone();
        let config = Arc::clone(&config);

        Box::pin(async move {
            tracing::info!("scheduler: starting scrape run");
            match scrape::run_scrape(Some(&pool), &config, None, false).await {
                Ok(summary) => tracing::info!(
                    stores = summary.stores,
                    failed = summary.failed,
                    offers = summary.offers,
                    persisted = summary.persisted,
                    "scheduler: scrape run complete"
                ),
                Err(e) => tracing::error!(error = %e, "scheduler: scrape run failed"),
            }
        })
    })
    .map_err(|e| anyhow::anyhow!("invalid OFFERDB_SCRAPE_CRON '{cron}': {e}"))?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    tracing::info!(cron = %cron, "scheduler started; press Ctrl-C to stop");

    tokio::signal::ctrl_c().await?;
    tracing::info!("received shutdown signal, stopping scheduler");
    scheduler.shutdown().await?;
    Ok(())
}
