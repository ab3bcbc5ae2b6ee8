//! Periodic lifecycle sweeps

use chrono::{Local, NaiveDate};
use std::time::Duration;
use tokio::task::JoinHandle;

use super::Services;
use crate::error::AppResult;

/// Runs the overdue and expiry sweeps on every tick and the reminders once
/// per calendar day
pub struct Sweeper {
    services: Services,
    last_reminder_day: Option<NaiveDate>,
}

/// What one tick did
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct SweepReport {
    pub flagged_late: usize,
    pub expired: usize,
    pub reminders: Option<usize>,
}

impl Sweeper {
    pub fn new(services: Services) -> Self {
        Self {
            services,
            last_reminder_day: None,
        }
    }

    pub async fn run_once(&mut self, today: NaiveDate) -> AppResult<SweepReport> {
        let settings = self.services.settings.current().await?;

        let flagged_late = self.services.loans.mark_overdue(today).await?.len();
        let expired = self.services.reservations.sweep_expired(today).await?.len();

        let mut reminders = None;
        if self.last_reminder_day != Some(today) {
            reminders = Some(
                self.services
                    .loans
                    .send_reminders(today, settings.reminder_lead_days)
                    .await?,
            );
            self.last_reminder_day = Some(today);
        }

        Ok(SweepReport {
            flagged_late,
            expired,
            reminders,
        })
    }
}

/// Spawn the sweep loop; errors are logged and the next tick runs anyway
pub fn spawn(services: Services, interval_secs: u64) -> JoinHandle<()> {
    let mut sweeper = Sweeper::new(services);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(interval_secs.max(1)));
        loop {
            interval.tick().await;
            let today = Local::now().date_naive();
            match sweeper.run_once(today).await {
                Ok(report) => tracing::debug!("Sweep for {} done: {:?}", today, report),
                Err(e) => tracing::error!("Sweep for {} failed: {}", today, e),
            }
        }
    })
}
