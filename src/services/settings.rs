//! Settings service

use validator::Validate;

use crate::{
    error::AppResult,
    models::settings::LendingSettings,
    repository::Repository,
};

#[derive(Clone)]
pub struct SettingsService {
    repository: Repository,
    /// Used until a snapshot has been stored
    defaults: LendingSettings,
}

impl SettingsService {
    pub fn new(repository: Repository, defaults: LendingSettings) -> Self {
        Self { repository, defaults }
    }

    /// Get current settings
    pub async fn current(&self) -> AppResult<LendingSettings> {
        let mut tx = self.repository.begin().await?;
        let stored = tx.latest_settings().await?;
        Ok(stored.unwrap_or_else(|| self.defaults.clone()))
    }

    /// Store a new snapshot; it applies to every decision made afterwards
    pub async fn update(&self, settings: LendingSettings) -> AppResult<LendingSettings> {
        settings.validate()?;

        let mut tx = self.repository.begin().await?;
        tx.insert_settings(&settings).await?;
        tx.commit().await?;

        tracing::info!(
            "Lending settings updated: rate {}, cap {}, grace {} day(s)",
            settings.daily_penalty_rate,
            settings.penalty_cap,
            settings.grace_period_days
        );
        Ok(settings)
    }
}
