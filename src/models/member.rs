//! Member, subscription and copy records
//!
//! These rows belong to the profile and catalog systems; the lending core
//! only reads them.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

use super::enums::MembershipTier;

/// Copies whose condition code reaches this value are out of circulation
pub const WITHDRAWN_CONDITION: i16 = 4;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Member {
    pub id: i32,
    pub tier: MembershipTier,
}

/// Membership subscription window, both bounds included
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct Subscription {
    pub member_id: i32,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

impl Subscription {
    pub fn covers(&self, date: NaiveDate) -> bool {
        self.start_date <= date && date <= self.end_date
    }
}

/// Physical copy of a catalog item
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow, ToSchema)]
pub struct ItemCopy {
    pub id: i32,
    pub item_id: i32,
    /// Physical condition (0 = new ... 4+ = damaged or withdrawn)
    pub condition: i16,
}

impl ItemCopy {
    pub fn is_circulating(&self) -> bool {
        self.condition < WITHDRAWN_CONDITION
    }
}
