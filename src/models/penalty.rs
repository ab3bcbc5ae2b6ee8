//! Penalty model

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum PenaltyStatus {
    Active,
    Paid,
    Cancelled,
}

text_enum!(PenaltyStatus {
    Active => "active",
    Paid => "paid",
    Cancelled => "cancelled",
});

/// Monetary sanction; blocks the member while active over `[start_date, end_date)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Penalty {
    pub id: i32,
    pub member_id: i32,
    /// Loan whose late return caused the penalty
    pub loan_id: Option<i32>,
    pub start_date: NaiveDate,
    /// Exclusive
    pub end_date: NaiveDate,
    #[schema(value_type = String, example = "4.50")]
    pub amount: Decimal,
    pub reason: String,
    pub status: PenaltyStatus,
}

impl Penalty {
    /// Active and `date` inside the window
    pub fn blocks_on(&self, date: NaiveDate) -> bool {
        self.status == PenaltyStatus::Active && self.start_date <= date && date < self.end_date
    }
}

#[derive(Debug, Clone)]
pub struct NewPenalty {
    pub member_id: i32,
    pub loan_id: Option<i32>,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub amount: Decimal,
    pub reason: String,
}

/// Ledger totals
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct PenaltyTotals {
    #[schema(value_type = String)]
    pub active: Decimal,
    #[schema(value_type = String)]
    pub paid: Decimal,
}
