//! Recurring sweep registration on tokio-cron-scheduler.
//!
//! Each task runs one sweep. Failures are logged inside the job so the
//! scheduler keeps ticking.

use anyhow::Result;
use tokio_cron_scheduler::{Job, JobScheduler};
use tracing::{error, info};

use carmarket_core::config::SchedulerConfig;
use carmarket_core::sweep::SweepKind;

use crate::Sweeper;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct RecurringTask {
    pub name: &'static str,
    pub cron: String,
    pub kind: SweepKind,
}

pub fn recurring_tasks(config: &SchedulerConfig) -> Vec<RecurringTask> {
    SweepKind::ALL
        .into_iter()
        .map(|kind| RecurringTask { name: kind.as_str(), cron: cron_for(config, kind).to_string(), kind })
        .collect()
}

fn cron_for(config: &SchedulerConfig, kind: SweepKind) -> &str {
    match kind {
        SweepKind::Expire => &config.expire_cron,
        SweepKind::Purge => &config.purge_cron,
        SweepKind::Finalize => &config.finalize_cron,
        SweepKind::HotDealExpiry => &config.hot_deal_expiry_cron,
        SweepKind::PreExpiryWarning => &config.pre_expiry_warning_cron,
        SweepKind::PreDeletionWarning => &config.pre_deletion_warning_cron,
    }
}

/// Registers every sweep and starts the scheduler.
pub async fn start_scheduler(sweeper: Sweeper, config: &SchedulerConfig) -> Result<JobScheduler> {
    let scheduler = JobScheduler::new().await?;

    let tasks = recurring_tasks(config);
    for task in &tasks {
        scheduler.add(sweep_job(sweeper.clone(), task)?).await?;
    }
    scheduler.start().await?;

    info!(event_name = "scheduler.started", tasks = tasks.len(), "recurring sweeps scheduled");
    Ok(scheduler)
}

fn sweep_job(sweeper: Sweeper, task: &RecurringTask) -> Result<Job> {
    let kind = task.kind;
    let job = Job::new_async(task.cron.as_str(), move |_uuid, _lock| {
        let sweeper = sweeper.clone();
        Box::pin(async move {
            if let Err(err) = sweeper.run(kind).await {
                error!(event_name = "scheduler.task_failed", sweep = %kind, error = %err, "scheduled sweep failed");
            }
        })
    })?;
    Ok(job)
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use carmarket_core::config::{AppConfig, Environment};
    use carmarket_core::ports::InMemoryNotificationSender;
    use carmarket_core::sweep::{SweepKind, SweepPolicy};
    use carmarket_db::connect_with_settings;

    use super::{recurring_tasks, sweep_job, RecurringTask};
    use crate::Sweeper;

    #[test]
    fn default_schedule_covers_every_sweep() {
        let config = AppConfig::default();
        let tasks = recurring_tasks(&config.scheduler);

        assert_eq!(tasks.len(), SweepKind::ALL.len());
        let hot_deals = tasks
            .iter()
            .find(|task| task.kind == SweepKind::HotDealExpiry)
            .expect("hot-deal task");
        assert_eq!(hot_deals.cron, "0 0 * * * *");
        let expire = tasks.iter().find(|task| task.kind == SweepKind::Expire).expect("expire task");
        assert_eq!(expire.name, "expire");
        assert_eq!(expire.cron, "0 0 3 * * *");
    }

    #[tokio::test]
    async fn invalid_cron_is_rejected_at_registration() {
        let pool = connect_with_settings("sqlite::memory:", 1, 30).await.expect("connect");
        let config = AppConfig::default();
        let sweeper = Sweeper::new(
            pool,
            Environment::Development,
            SweepPolicy::from_config(&config.lifecycle),
            Arc::new(InMemoryNotificationSender::default()),
        );

        let task = RecurringTask { name: "expire", cron: "not a cron".to_string(), kind: SweepKind::Expire };
        assert!(sweep_job(sweeper, &task).is_err());
    }
}
