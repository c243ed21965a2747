use std::{future::Future, sync::Arc};

use color_eyre::{eyre::eyre, Result};
use tokio_cron_scheduler::Job;
use tracing::{debug, error, info};

use crate::reply_cache::ReplyCache;

#[derive(Clone)]
pub struct JobContext {
    pub replies: Arc<ReplyCache>,
}

pub fn make_job<F, Fut>(name: &str, schedule: &str, callback: F, ctx: JobContext) -> Result<Job>
where
    F: Send + Sync + Copy + FnOnce(JobContext) -> Fut + 'static,
    Fut: Send + Future<Output = Result<()>>,
{
    let job_name = name.to_owned();
    Job::new_async(schedule, move |_uuid, _lock| {
        let job_name = job_name.clone();
        let ctx = ctx.clone();
        Box::pin(async move {
            match callback(ctx).await {
                Ok(()) => {
                    debug!("Job {job_name} completed successfully.");
                }
                Err(e) => {
                    error!("Job {job_name} failed: {e}");
                }
            }
        })
    })
    .map_err(|e| eyre!("failed to create job {name}: {e}"))
}

/// Drops expired reply-cache entries so a quiet bot doesn't hold on to
/// five-minute-old invocation bookkeeping forever.
pub async fn sweep_replies(ctx: JobContext) -> Result<()> {
    let removed = ctx.replies.sweep();
    if removed > 0 {
        info!("Swept {removed} expired replies from the cache");
    }
    Ok(())
}
