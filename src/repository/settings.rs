//! Settings repository: newest `lending_settings` row wins

use async_trait::async_trait;
use sqlx::Row;

use super::PgTx;
use crate::{
    error::AppResult,
    models::settings::{LendingSettings, TierQuotas},
};

#[async_trait]
pub trait SettingsStore: Send {
    async fn latest_settings(&mut self) -> AppResult<Option<LendingSettings>>;

    async fn insert_settings(&mut self, settings: &LendingSettings) -> AppResult<()>;
}

#[async_trait]
impl SettingsStore for PgTx {
    async fn latest_settings(&mut self) -> AppResult<Option<LendingSettings>> {
        let row = sqlx::query(
            r#"
            SELECT daily_penalty_rate, penalty_cap, grace_period_days, default_loan_days,
                   max_extension_days, hold_window_days, reminder_lead_days,
                   student_quota, professor_quota, professional_quota, anonymous_quota
            FROM lending_settings
            ORDER BY id DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&mut *self.tx)
        .await?;

        Ok(row.map(|row| LendingSettings {
            daily_penalty_rate: row.get("daily_penalty_rate"),
            penalty_cap: row.get("penalty_cap"),
            grace_period_days: row.get("grace_period_days"),
            default_loan_days: row.get("default_loan_days"),
            max_extension_days: row.get("max_extension_days"),
            hold_window_days: row.get("hold_window_days"),
            reminder_lead_days: row.get("reminder_lead_days"),
            quotas: TierQuotas {
                student: row.get("student_quota"),
                professor: row.get("professor_quota"),
                professional: row.get("professional_quota"),
                anonymous: row.get("anonymous_quota"),
            },
        }))
    }

    async fn insert_settings(&mut self, settings: &LendingSettings) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO lending_settings (
                daily_penalty_rate, penalty_cap, grace_period_days, default_loan_days,
                max_extension_days, hold_window_days, reminder_lead_days,
                student_quota, professor_quota, professional_quota, anonymous_quota
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(settings.daily_penalty_rate)
        .bind(settings.penalty_cap)
        .bind(settings.grace_period_days)
        .bind(settings.default_loan_days)
        .bind(settings.max_extension_days)
        .bind(settings.hold_window_days)
        .bind(settings.reminder_lead_days)
        .bind(settings.quotas.student)
        .bind(settings.quotas.professor)
        .bind(settings.quotas.professional)
        .bind(settings.quotas.anonymous)
        .execute(&mut *self.tx)
        .await?;
        Ok(())
    }
}
