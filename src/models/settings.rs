//! Lending settings snapshot

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::{Validate, ValidationError};

use super::enums::MembershipTier;

/// Maximum concurrent open loans (and extensions per subscription period)
/// for each membership tier
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct TierQuotas {
    #[validate(range(min = 0))]
    pub student: i32,
    #[validate(range(min = 0))]
    pub professor: i32,
    #[validate(range(min = 0))]
    pub professional: i32,
    #[validate(range(min = 0))]
    pub anonymous: i32,
}

impl TierQuotas {
    pub fn for_tier(&self, tier: MembershipTier) -> i64 {
        let quota = match tier {
            MembershipTier::Student => self.student,
            MembershipTier::Professor => self.professor,
            MembershipTier::Professional => self.professional,
            MembershipTier::Anonymous => self.anonymous,
        };
        i64::from(quota)
    }
}

impl Default for TierQuotas {
    fn default() -> Self {
        Self {
            student: 3,
            professor: 5,
            professional: 4,
            anonymous: 1,
        }
    }
}

/// Immutable configuration read at the moment of each decision.
///
/// Lifecycle operations receive it as an explicit argument; nothing caches
/// it across calls.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Validate, ToSchema)]
pub struct LendingSettings {
    /// Amount charged per late day
    #[schema(value_type = String, example = "0.50")]
    #[validate(custom(function = "non_negative"))]
    pub daily_penalty_rate: Decimal,
    /// Upper bound of a single penalty
    #[schema(value_type = String, example = "20.00")]
    #[validate(custom(function = "non_negative"))]
    pub penalty_cap: Decimal,
    /// Days past the due date before a return is penalized
    #[validate(range(min = 0, max = 365))]
    pub grace_period_days: i32,
    /// Loan duration when the request does not give one
    #[validate(range(min = 1, max = 3650))]
    pub default_loan_days: i32,
    /// Longest single extension
    #[validate(range(min = 1, max = 365))]
    pub max_extension_days: i32,
    /// Days a reservation stays claimable
    #[validate(range(min = 0, max = 365))]
    pub hold_window_days: i32,
    /// How many days ahead of the due date reminders go out
    #[validate(range(min = 0, max = 365))]
    pub reminder_lead_days: i32,
    #[validate(nested)]
    pub quotas: TierQuotas,
}

fn non_negative(value: &Decimal) -> Result<(), ValidationError> {
    if value.is_sign_negative() && !value.is_zero() {
        return Err(ValidationError::new("negative_amount"));
    }
    Ok(())
}

impl Default for LendingSettings {
    fn default() -> Self {
        Self {
            daily_penalty_rate: Decimal::new(50, 2),
            penalty_cap: Decimal::new(2000, 2),
            grace_period_days: 2,
            default_loan_days: 14,
            max_extension_days: 10,
            hold_window_days: 3,
            reminder_lead_days: 3,
            quotas: TierQuotas::default(),
        }
    }
}
