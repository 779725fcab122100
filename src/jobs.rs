//! Scheduled jobs (C9 cleanup): the expired-notification sweep, run on a
//! cron schedule derived from `cleanup_interval_hours`.

use std::sync::Arc;
use tokio_cron_scheduler::{Job, JobScheduler};

use crate::state::AppState;

pub async fn start_cleanup_scheduler(state: Arc<AppState>) -> anyhow::Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;
    let interval_hours = state.config.app.cleanup_interval_hours.max(1);
    let cron_expr = format!("0 0 0/{interval_hours} * * *");

    let job = Job::new_async(cron_expr.as_str(), move |_uuid, _l| {
        let state = state.clone();
        Box::pin(async move {
            match state.repos.notifications.cleanup_expired().await {
                Ok(count) => {
                    if count > 0 {
                        tracing::info!(deleted = count, "cleanup job removed expired notifications");
                    }
                    crate::observability::record_cleanup_deleted("notifications", count);
                }
                Err(e) => tracing::error!("cleanup job failed: {e}"),
            }
        })
    })?;

    scheduler.add(job).await?;
    scheduler.start().await?;
    Ok(scheduler)
}
