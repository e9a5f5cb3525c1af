//! Cron-style job scheduler using tokio-cron-scheduler.

use chrono::Utc;
use tokio_cron_scheduler::{Job, JobScheduler, JobSchedulerError};

use crate::state::AppState;

/// Scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Enable scheduler.
    pub enabled: bool,
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

impl SchedulerConfig {
    pub fn from_env() -> Self {
        Self {
            enabled: std::env::var("SCHEDULER_ENABLED")
                .map(|v| v != "false" && v != "0")
                .unwrap_or(true),
        }
    }
}

/// Cron job scheduler wrapper.
pub struct Scheduler {
    inner: JobScheduler,
    config: SchedulerConfig,
}

impl Scheduler {
    pub async fn new(config: SchedulerConfig) -> Result<Self, JobSchedulerError> {
        let inner = JobScheduler::new().await?;
        Ok(Self { inner, config })
    }

    pub fn is_enabled(&self) -> bool {
        self.config.enabled
    }

    /// Add a cron job. Schedules have six fields, seconds first.
    pub async fn add_cron<F, Fut>(
        &self,
        schedule: &str,
        task: F,
    ) -> Result<uuid::Uuid, JobSchedulerError>
    where
        F: Fn() -> Fut + Send + Sync + Clone + 'static,
        Fut: std::future::Future<Output = ()> + Send + 'static,
    {
        let job = Job::new_async(schedule, move |_uuid, _lock| {
            let task = task.clone();
            Box::pin(async move {
                task().await;
            })
        })?;

        let id = self.inner.add(job).await?;
        tracing::info!(schedule = %schedule, job_id = %id, "Cron job registered");
        Ok(id)
    }

    pub async fn start(&self) -> Result<(), JobSchedulerError> {
        if !self.config.enabled {
            tracing::info!("Scheduler disabled");
            return Ok(());
        }

        self.inner.start().await?;
        tracing::info!("Scheduler started");
        Ok(())
    }

    pub async fn shutdown(&mut self) -> Result<(), JobSchedulerError> {
        self.inner.shutdown().await?;
        tracing::info!("Scheduler stopped");
        Ok(())
    }
}

/// Register the orphan sweep on `schedule` and start the scheduler.
pub async fn start_orphan_sweep(
    state: &AppState,
    schedule: &str,
    config: SchedulerConfig,
) -> Result<Scheduler, JobSchedulerError> {
    let scheduler = Scheduler::new(config).await?;
    if !scheduler.is_enabled() {
        tracing::info!("Orphan sweep not scheduled");
        return Ok(scheduler);
    }

    let sweeper = state.sweeper.clone();
    scheduler
        .add_cron(schedule, move || {
            let sweeper = sweeper.clone();
            async move {
                match sweeper.sweep(Utc::now()).await {
                    Ok(report) if report.removed > 0 => {
                        tracing::info!(
                            scanned = report.scanned,
                            removed = report.removed,
                            "Orphan sweep finished"
                        );
                    }
                    Ok(report) => {
                        tracing::debug!(scanned = report.scanned, "Orphan sweep found nothing");
                    }
                    Err(e) => tracing::error!(error = %e, "Orphan sweep failed"),
                }
            }
        })
        .await?;

    scheduler.start().await?;
    Ok(scheduler)
}
