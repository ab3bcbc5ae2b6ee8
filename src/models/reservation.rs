//! Reservation (hold) model

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::text_enum;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ReservationStatus {
    /// Waiting for the copy
    Pending,
    /// Copy ready for pickup
    Fulfilled,
    Cancelled,
    Expired,
}

text_enum!(ReservationStatus {
    Pending => "pending",
    Fulfilled => "fulfilled",
    Cancelled => "cancelled",
    Expired => "expired",
});

impl ReservationStatus {
    pub fn is_terminal(&self) -> bool {
        matches!(self, ReservationStatus::Cancelled | ReservationStatus::Expired)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Reservation {
    pub id: i32,
    pub copy_id: i32,
    pub item_id: i32,
    pub member_id: i32,
    pub created_on: NaiveDate,
    pub expires_on: NaiveDate,
    pub status: ReservationStatus,
}

impl Reservation {
    pub fn is_active(&self) -> bool {
        !self.status.is_terminal()
    }
}

#[derive(Debug, Clone)]
pub struct NewReservation {
    pub copy_id: i32,
    pub item_id: i32,
    pub member_id: i32,
    pub created_on: NaiveDate,
    pub expires_on: NaiveDate,
}
