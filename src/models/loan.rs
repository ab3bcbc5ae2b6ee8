//! Loan (borrow) model and related types

use chrono::NaiveDate;

use crate::error::AppResult;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;
use validator::Validate;

use super::enums::{text_enum, LoanType};
use super::penalty::Penalty;
use super::reservation::Reservation;

/// Loan lifecycle state; lateness is tracked by [`Loan::is_late`]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum LoanStatus {
    Open,
    Returned,
}

text_enum!(LoanStatus {
    Open => "open",
    Returned => "returned",
});

/// Loan model from database
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Loan {
    pub id: i32,
    pub copy_id: i32,
    pub item_id: i32,
    pub member_id: i32,
    /// Staff member who issued the loan
    pub staff_id: i32,
    pub loan_type: LoanType,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
    pub return_date: Option<NaiveDate>,
    pub status: LoanStatus,
    /// Set by the overdue sweep, finalized on return
    pub is_late: bool,
    pub nb_extensions: i32,
}

impl Loan {
    pub fn is_open(&self) -> bool {
        self.status == LoanStatus::Open
    }

    /// Last day a return is still inside the grace period
    pub fn grace_limit(&self, grace_period_days: i32) -> AppResult<NaiveDate> {
        super::add_days(self.due_date, i64::from(grace_period_days))
    }
}

/// Values for a loan about to be inserted
#[derive(Debug, Clone)]
pub struct NewLoan {
    pub copy_id: i32,
    pub item_id: i32,
    pub member_id: i32,
    pub staff_id: i32,
    pub loan_type: LoanType,
    pub start_date: NaiveDate,
    pub due_date: NaiveDate,
}

/// Create loan request
#[derive(Debug, Clone, Deserialize, Validate, ToSchema)]
pub struct CreateLoan {
    pub copy_id: i32,
    pub member_id: i32,
    pub staff_id: i32,
    #[serde(default)]
    pub loan_type: LoanType,
    /// Falls back to the configured default duration
    #[validate(range(min = 0, max = 3650))]
    pub duration_days: Option<i32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ExtensionStatus {
    Pending,
    Approved,
    Refused,
}

text_enum!(ExtensionStatus {
    Pending => "pending",
    Approved => "approved",
    Refused => "refused",
});

/// Extension (renewal) record, counted against the member's quota
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct LoanExtension {
    pub id: i32,
    pub loan_id: i32,
    pub member_id: i32,
    pub requested_on: NaiveDate,
    pub new_due_date: NaiveDate,
    pub status: ExtensionStatus,
}

#[derive(Debug, Clone)]
pub struct NewLoanExtension {
    pub loan_id: i32,
    pub member_id: i32,
    pub requested_on: NaiveDate,
    pub new_due_date: NaiveDate,
    pub status: ExtensionStatus,
}

/// Everything a return changed, in the order it happened
#[derive(Debug, Clone, Serialize, ToSchema)]
pub struct ReturnOutcome {
    pub loan: Loan,
    /// Penalty issued for a return past the grace period
    pub penalty: Option<Penalty>,
    /// The borrower's own hold on the copy, closed by the return
    pub released: Option<Reservation>,
    /// Oldest pending hold on the item, fulfilled by the return
    pub fulfilled: Option<Reservation>,
}
