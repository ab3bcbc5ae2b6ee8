//! Outgoing lifecycle notifications

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use utoipa::ToSchema;

use super::enums::NotificationKind;
use super::loan::Loan;
use super::penalty::Penalty;
use super::reservation::Reservation;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct Notification {
    pub member_id: i32,
    pub kind: NotificationKind,
    /// Ids and dates of the record concerned, plus a readable message
    #[schema(value_type = Object)]
    pub payload: Value,
    pub created_at: DateTime<Utc>,
}

impl Notification {
    fn new(member_id: i32, kind: NotificationKind, payload: Value) -> Self {
        Self {
            member_id,
            kind,
            payload,
            created_at: Utc::now(),
        }
    }

    pub fn reminder(loan: &Loan) -> Self {
        Self::new(
            loan.member_id,
            NotificationKind::Reminder,
            json!({
                "loan_id": loan.id,
                "copy_id": loan.copy_id,
                "due_date": loan.due_date,
                "message": format!("Reminder: loan #{} is due on {}", loan.id, loan.due_date),
            }),
        )
    }

    pub fn late(loan: &Loan) -> Self {
        Self::new(
            loan.member_id,
            NotificationKind::Late,
            json!({
                "loan_id": loan.id,
                "copy_id": loan.copy_id,
                "due_date": loan.due_date,
                "message": format!(
                    "Loan #{} was due on {}. Please return it quickly to avoid penalties.",
                    loan.id, loan.due_date
                ),
            }),
        )
    }

    pub fn penalty(penalty: &Penalty) -> Self {
        Self::new(
            penalty.member_id,
            NotificationKind::Penalty,
            json!({
                "penalty_id": penalty.id,
                "loan_id": penalty.loan_id,
                "amount": penalty.amount,
                "start_date": penalty.start_date,
                "end_date": penalty.end_date,
                "message": format!(
                    "A penalty of {} has been applied to your account. Reason: {}",
                    penalty.amount, penalty.reason
                ),
            }),
        )
    }

    pub fn hold_ready(reservation: &Reservation) -> Self {
        Self::new(
            reservation.member_id,
            NotificationKind::HoldReady,
            json!({
                "reservation_id": reservation.id,
                "copy_id": reservation.copy_id,
                "item_id": reservation.item_id,
                "expires_on": reservation.expires_on,
                "message": format!(
                    "Your reservation #{} is ready. You have until {} to pick it up.",
                    reservation.id, reservation.expires_on
                ),
            }),
        )
    }
}
