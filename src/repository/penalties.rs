//! Penalties repository

use async_trait::async_trait;
use chrono::NaiveDate;
use rust_decimal::Decimal;

use super::PgTx;
use crate::{
    error::AppResult,
    models::penalty::{NewPenalty, Penalty, PenaltyStatus},
};

const PENALTY_COLUMNS: &str = "id, member_id, loan_id, start_date, end_date, amount, reason, status";

#[async_trait]
pub trait PenaltyStore: Send {
    /// Fetch and lock a penalty
    async fn get_penalty(&mut self, penalty_id: i32) -> AppResult<Option<Penalty>>;

    /// Active penalties of a member whose window `[start, end)` contains `date`
    async fn blocking_penalties(&mut self, member_id: i32, date: NaiveDate) -> AppResult<Vec<Penalty>>;

    /// All penalties, optionally restricted to one status, newest first
    async fn list_penalties(&mut self, status: Option<PenaltyStatus>) -> AppResult<Vec<Penalty>>;

    async fn insert_penalty(&mut self, penalty: &NewPenalty) -> AppResult<Penalty>;

    async fn set_penalty_status(&mut self, penalty_id: i32, status: PenaltyStatus) -> AppResult<()>;

    /// Sum of amounts with the given status, for one member or everybody
    async fn penalty_total(&mut self, status: PenaltyStatus, member_id: Option<i32>) -> AppResult<Decimal>;
}

#[async_trait]
impl PenaltyStore for PgTx {
    async fn get_penalty(&mut self, penalty_id: i32) -> AppResult<Option<Penalty>> {
        let query = format!("SELECT {} FROM penalties WHERE id = $1 FOR UPDATE", PENALTY_COLUMNS);
        let penalty = sqlx::query_as::<_, Penalty>(&query)
            .bind(penalty_id)
            .fetch_optional(&mut *self.tx)
            .await?;
        Ok(penalty)
    }

    async fn blocking_penalties(&mut self, member_id: i32, date: NaiveDate) -> AppResult<Vec<Penalty>> {
        let query = format!(
            "SELECT {} FROM penalties \
             WHERE member_id = $1 AND status = 'active' AND start_date <= $2 AND $2 < end_date \
             ORDER BY start_date, id",
            PENALTY_COLUMNS
        );
        let penalties = sqlx::query_as::<_, Penalty>(&query)
            .bind(member_id)
            .bind(date)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(penalties)
    }

    async fn list_penalties(&mut self, status: Option<PenaltyStatus>) -> AppResult<Vec<Penalty>> {
        let query = format!(
            "SELECT {} FROM penalties WHERE ($1::TEXT IS NULL OR status = $1) ORDER BY id DESC",
            PENALTY_COLUMNS
        );
        let penalties = sqlx::query_as::<_, Penalty>(&query)
            .bind(status)
            .fetch_all(&mut *self.tx)
            .await?;
        Ok(penalties)
    }

    async fn insert_penalty(&mut self, penalty: &NewPenalty) -> AppResult<Penalty> {
        let query = format!(
            r#"
            INSERT INTO penalties (member_id, loan_id, start_date, end_date, amount, reason, status)
            VALUES ($1, $2, $3, $4, $5, $6, 'active')
            RETURNING {}
            "#,
            PENALTY_COLUMNS
        );
        let created = sqlx::query_as::<_, Penalty>(&query)
            .bind(penalty.member_id)
            .bind(penalty.loan_id)
            .bind(penalty.start_date)
            .bind(penalty.end_date)
            .bind(penalty.amount)
            .bind(&penalty.reason)
            .fetch_one(&mut *self.tx)
            .await?;
        Ok(created)
    }

    async fn set_penalty_status(&mut self, penalty_id: i32, status: PenaltyStatus) -> AppResult<()> {
        sqlx::query("UPDATE penalties SET status = $2 WHERE id = $1")
            .bind(penalty_id)
            .bind(status)
            .execute(&mut *self.tx)
            .await?;
        Ok(())
    }

    async fn penalty_total(&mut self, status: PenaltyStatus, member_id: Option<i32>) -> AppResult<Decimal> {
        let total: Option<Decimal> = sqlx::query_scalar(
            "SELECT SUM(amount) FROM penalties WHERE status = $1 AND ($2::INT IS NULL OR member_id = $2)",
        )
        .bind(status)
        .bind(member_id)
        .fetch_one(&mut *self.tx)
        .await?;
        Ok(total.unwrap_or(Decimal::ZERO))
    }
}
