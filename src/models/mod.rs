//! Data models for the lending core

use chrono::{Duration, NaiveDate};

use crate::error::{AppError, AppResult};

pub mod enums;
pub mod loan;
pub mod member;
pub mod notification;
pub mod penalty;
pub mod reservation;
pub mod settings;

// Re-export commonly used types
pub use enums::{LoanType, MembershipTier, NotificationKind};
pub use loan::{CreateLoan, Loan, LoanExtension, LoanStatus, ReturnOutcome};
pub use member::{ItemCopy, Member, Subscription};
pub use notification::Notification;
pub use penalty::{Penalty, PenaltyStatus, PenaltyTotals};
pub use reservation::{Reservation, ReservationStatus};
pub use settings::{LendingSettings, TierQuotas};

/// `date + days`, or a validation error when the result falls outside the
/// supported calendar
pub fn add_days(date: NaiveDate, days: i64) -> AppResult<NaiveDate> {
    Duration::try_days(days)
        .and_then(|delta| date.checked_add_signed(delta))
        .ok_or_else(|| AppError::Validation(format!("{} + {} day(s) is out of range", date, days)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_add_days() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert_eq!(add_days(date, 5).unwrap(), NaiveDate::from_ymd_opt(2024, 1, 15).unwrap());
        assert_eq!(add_days(date, -10).unwrap(), NaiveDate::from_ymd_opt(2023, 12, 31).unwrap());
    }

    #[test]
    fn test_add_days_out_of_range() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 10).unwrap();
        assert!(matches!(add_days(date, i64::from(i32::MAX)), Err(AppError::Validation(_))));
        assert!(matches!(add_days(date, i64::MAX), Err(AppError::Validation(_))));
    }
}
