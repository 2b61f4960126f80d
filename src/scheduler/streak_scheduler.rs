use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;

use crate::commands::settings::get_settings;
use crate::db::Database;
use crate::error::{JournalError, JournalResult};
use crate::scheduler::sweep::{sweep, SweepReport};

/// Background scheduler for time-driven streak and target upkeep
#[derive(Clone)]
pub struct StreakScheduler {
    db: Arc<Database>,
    tasks: Arc<RwLock<Vec<JoinHandle<()>>>>,
}

impl StreakScheduler {
    pub fn new(db: Arc<Database>) -> Self {
        Self {
            db,
            tasks: Arc::new(RwLock::new(Vec::new())),
        }
    }

    /// Start the scheduler with the interval stored in settings
    pub async fn start(&self) {
        log::info!("Starting streak scheduler...");

        if let Err(e) = self.reload_tasks().await {
            log::error!("Failed to start streak scheduler: {}", e);
        }
    }

    /// Stop the running task and start a new one, picking up interval changes
    pub async fn reload_tasks(&self) -> JournalResult<()> {
        self.stop_all_tasks().await;

        let interval_secs = get_settings(&self.db)?.streak_check_interval_secs.max(1);
        self.start_sweep_task(interval_secs as u64).await;

        Ok(())
    }

    async fn start_sweep_task(&self, interval_secs: u64) {
        let db = self.db.clone();

        log::info!("Starting sweep task - interval: {}s", interval_secs);

        let handle = tokio::spawn(async move {
            let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

            loop {
                interval.tick().await;

                log::debug!("Sweep tick");

                if let Err(e) = Self::run_sweep(db.clone()).await {
                    log::error!("Sweep failed: {}", e);
                }
            }
        });

        let mut tasks = self.tasks.write().await;
        tasks.push(handle);
    }

    /// The sweep takes the connection mutex, so it runs off the async workers.
    async fn run_sweep(db: Arc<Database>) -> JournalResult<SweepReport> {
        tokio::task::spawn_blocking(move || sweep(&db, Utc::now()))
            .await
            .map_err(|e| JournalError::TaskError(e.to_string()))?
    }

    /// One sweep right now, outside the schedule
    pub async fn run_once(&self) -> JournalResult<SweepReport> {
        Self::run_sweep(self.db.clone()).await
    }

    pub async fn is_running(&self) -> bool {
        let tasks = self.tasks.read().await;
        tasks.iter().any(|task| !task.is_finished())
    }

    async fn stop_all_tasks(&self) {
        let mut tasks = self.tasks.write().await;

        for task in tasks.drain(..) {
            task.abort();
        }

        log::debug!("Streak scheduler tasks stopped");
    }

    pub async fn stop(&self) {
        self.stop_all_tasks().await;
        log::info!("Streak scheduler stopped");
    }
}
