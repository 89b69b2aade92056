//! The overdue sweep.
//!
//! [`RecurringTask`] runs a job on a fixed period; [`OverdueSweep`] is the
//! job.  Each tick scans every user's plants and logs at most one
//! `overdue_watering` and one `overdue_fertilizing` activity per plant per
//! calendar day.  The check-then-append is not transactional, so two
//! concurrent ticks could double-log; the daemon only ever runs one.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::task::JoinHandle;
use tokio::time::{Instant, MissedTickBehavior, interval_at};

use crate::{Activity, CareTask, Clock, DataStore, DataStoreError};

/// Default sweep period.
pub const DEFAULT_SWEEP_INTERVAL: Duration = Duration::from_secs(60);

///////////////////////////////////////////// RecurringTask ///////////////////////////////////////////

/// Runs a job every `period` on the tokio runtime.
///
/// The first run happens one period after spawning.  A run that overruns the
/// period delays the next one instead of bursting.
#[derive(Debug, Clone)]
pub struct RecurringTask {
    name: String,
    period: Duration,
}

impl RecurringTask {
    pub fn new(name: impl Into<String>, period: Duration) -> Self {
        RecurringTask {
            name: name.into(),
            period,
        }
    }

    pub fn period(&self) -> Duration {
        self.period
    }

    /// Spawns the loop.  Abort the handle to stop it.
    pub fn spawn<F, Fut>(self, mut job: F) -> JoinHandle<()>
    where
        F: FnMut() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + self.period, self.period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            tracing::info!(task = %self.name, period = ?self.period, "recurring task started");
            loop {
                ticker.tick().await;
                tracing::trace!(task = %self.name, "tick");
                job().await;
            }
        })
    }
}

////////////////////////////////////////////// SweepReport ////////////////////////////////////////////

/// What one sweep tick appended.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepReport {
    pub overdue_watering: usize,
    pub overdue_fertilizing: usize,
}

impl SweepReport {
    pub fn total(&self) -> usize {
        self.overdue_watering + self.overdue_fertilizing
    }

    fn record(&mut self, task: CareTask) {
        match task {
            CareTask::Watering => self.overdue_watering += 1,
            CareTask::Fertilizing => self.overdue_fertilizing += 1,
        }
    }
}

////////////////////////////////////////////// OverdueSweep ///////////////////////////////////////////

/// Flags overdue plants in the activity log.
#[derive(Clone)]
pub struct OverdueSweep {
    store: Arc<dyn DataStore>,
    clock: Arc<dyn Clock>,
}

impl OverdueSweep {
    pub fn new(store: Arc<dyn DataStore>, clock: Arc<dyn Clock>) -> Self {
        OverdueSweep { store, clock }
    }

    /// Runs one pass over all plants.
    pub async fn tick(&self) -> Result<SweepReport, DataStoreError> {
        let now = self.clock.now();
        let day_start = self.clock.start_of_day();
        let mut report = SweepReport::default();
        for task in CareTask::ALL {
            let kind = task.overdue_activity();
            for plant in self.store.list_overdue_plants(task, now).await? {
                if self
                    .store
                    .activity_exists_since(plant.id, kind, day_start)
                    .await?
                {
                    continue;
                }
                let activity = Activity::new(
                    plant.owner,
                    plant.id,
                    kind,
                    now,
                    Some(task.overdue_note().to_string()),
                );
                self.store.append_activity(&activity).await?;
                tracing::debug!(plant = %plant.id, %task, "overdue logged");
                report.record(task);
            }
        }
        Ok(report)
    }

    /// Runs one pass, logging the outcome.  Errors are not propagated; the
    /// next tick simply tries again.
    pub async fn run_tick(&self) {
        match self.tick().await {
            Ok(report) if report.total() > 0 => tracing::info!(
                watering = report.overdue_watering,
                fertilizing = report.overdue_fertilizing,
                "overdue sweep logged activities"
            ),
            Ok(_) => tracing::debug!("overdue sweep found nothing new"),
            Err(e) => tracing::error!(error = %e, "overdue sweep failed"),
        }
    }

    /// Starts sweeping every `period`.
    pub fn spawn(self, period: Duration) -> JoinHandle<()> {
        let sweep = Arc::new(self);
        RecurringTask::new("overdue-sweep", period).spawn(move || {
            let sweep = Arc::clone(&sweep);
            async move { sweep.run_tick().await }
        })
    }
}
