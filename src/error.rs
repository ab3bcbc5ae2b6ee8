//! Error types for the lending server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use utoipa::ToSchema;

use crate::models::reservation::ReservationStatus;

/// Numeric error codes returned in every error body
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    DbFailure = 3,
    NoSuchData = 4,
    BadValue = 5,
    Duplicate = 6,
    ActivePenalty = 10,
    InactiveMembership = 11,
    MaxBorrowsReached = 12,
    CopyUnavailable = 13,
    NoAvailableCopy = 14,
    InvalidTransition = 15,
    ExtensionTooLong = 16,
    MaxExtensionsReached = 17,
    SubscriptionEndsTooSoon = 18,
}

/// Active penalty reported by the eligibility gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct BlockingPenalty {
    pub id: i32,
    #[schema(value_type = String)]
    pub amount: Decimal,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

/// Why a member may not start a new loan, reservation or extension
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IneligibleReason {
    #[error("Member has an active penalty: {}", describe_penalties(.0))]
    ActivePenalty(Vec<BlockingPenalty>),

    #[error("Member has no active subscription")]
    InactiveMembership,

    #[error("Loan quota exceeded ({open}/{quota})")]
    QuotaExceeded { open: i64, quota: i64 },
}

fn describe_penalties(penalties: &[BlockingPenalty]) -> String {
    penalties
        .iter()
        .map(|p| format!("{} from {} to {}", p.amount, p.start_date, p.end_date))
        .collect::<Vec<_>>()
        .join(", ")
}

/// No copy or reservation target for the request
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum Unavailable {
    #[error("Copy {0} is already on loan")]
    CopyUnavailable(i32),

    #[error("No copy of item {0} is available")]
    NoAvailableCopy(i32),
}

/// Attempted transition out of a terminal or incompatible state
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("Loan {0} has already been returned")]
    AlreadyReturned(i32),

    #[error("Penalty {0} is already paid")]
    AlreadyPaid(i32),

    #[error("Penalty {0} is cancelled and cannot be modified")]
    CannotModifyCancelled(i32),

    #[error("Cannot {action} reservation {id} in status {from}")]
    Reservation {
        id: i32,
        from: ReservationStatus,
        action: &'static str,
    },
}

/// Extension rules
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum PolicyViolation {
    #[error("Extension too long ({requested} days, at most {max})")]
    ExtensionTooLong { requested: i32, max: i32 },

    #[error("Extension quota exceeded ({used}/{quota})")]
    ExtensionQuotaExceeded { used: i64, quota: i64 },

    #[error("New due date {new_due_date} is after the subscription end {subscription_end}")]
    SubscriptionExpiresBeforeNewDueDate {
        new_due_date: NaiveDate,
        subscription_end: NaiveDate,
    },
}

/// Main application error type
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Ineligible member: {0}")]
    Ineligible(#[from] IneligibleReason),

    #[error("Unavailable: {0}")]
    Unavailable(#[from] Unavailable),

    #[error("Invalid transition: {0}")]
    InvalidTransition(#[from] TransitionError),

    #[error("Policy violation: {0}")]
    PolicyViolation(#[from] PolicyViolation),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Internal server error: {0}")]
    Internal(String),
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(errors.to_string())
    }
}

impl AppError {
    fn code(&self) -> ErrorCode {
        match self {
            AppError::Ineligible(IneligibleReason::ActivePenalty(_)) => ErrorCode::ActivePenalty,
            AppError::Ineligible(IneligibleReason::InactiveMembership) => ErrorCode::InactiveMembership,
            AppError::Ineligible(IneligibleReason::QuotaExceeded { .. }) => ErrorCode::MaxBorrowsReached,
            AppError::Unavailable(Unavailable::CopyUnavailable(_)) => ErrorCode::CopyUnavailable,
            AppError::Unavailable(Unavailable::NoAvailableCopy(_)) => ErrorCode::NoAvailableCopy,
            AppError::InvalidTransition(_) => ErrorCode::InvalidTransition,
            AppError::PolicyViolation(PolicyViolation::ExtensionTooLong { .. }) => ErrorCode::ExtensionTooLong,
            AppError::PolicyViolation(PolicyViolation::ExtensionQuotaExceeded { .. }) => {
                ErrorCode::MaxExtensionsReached
            }
            AppError::PolicyViolation(PolicyViolation::SubscriptionExpiresBeforeNewDueDate { .. }) => {
                ErrorCode::SubscriptionEndsTooSoon
            }
            AppError::NotFound(_) => ErrorCode::NoSuchData,
            AppError::Validation(_) | AppError::BadRequest(_) => ErrorCode::BadValue,
            AppError::Conflict(_) => ErrorCode::Duplicate,
            AppError::Database(_) => ErrorCode::DbFailure,
            AppError::Internal(_) => ErrorCode::Failure,
        }
    }
}

/// Error response body
#[derive(Serialize, ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let code = self.code();
        let (status, message) = match &self {
            AppError::Ineligible(_) => (StatusCode::FORBIDDEN, self.to_string()),
            AppError::Unavailable(_) | AppError::InvalidTransition(_) | AppError::Conflict(_) => {
                (StatusCode::CONFLICT, self.to_string())
            }
            AppError::PolicyViolation(_) => (StatusCode::UNPROCESSABLE_ENTITY, self.to_string()),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg.clone()),
            AppError::Validation(msg) | AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (StatusCode::INTERNAL_SERVER_ERROR, "Database error".to_string())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "Internal server error".to_string())
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::quota(
        AppError::from(IneligibleReason::QuotaExceeded { open: 3, quota: 3 }),
        StatusCode::FORBIDDEN
    )]
    #[case::copy_on_loan(AppError::from(Unavailable::CopyUnavailable(7)), StatusCode::CONFLICT)]
    #[case::already_paid(AppError::from(TransitionError::AlreadyPaid(1)), StatusCode::CONFLICT)]
    #[case::too_long(
        AppError::from(PolicyViolation::ExtensionTooLong { requested: 12, max: 10 }),
        StatusCode::UNPROCESSABLE_ENTITY
    )]
    #[case::not_found(AppError::NotFound("Loan 1".into()), StatusCode::NOT_FOUND)]
    fn test_status_mapping(#[case] error: AppError, #[case] expected: StatusCode) {
        assert_eq!(error.into_response().status(), expected);
    }

    #[test]
    fn test_active_penalty_message_lists_windows() {
        let reason = IneligibleReason::ActivePenalty(vec![BlockingPenalty {
            id: 1,
            amount: Decimal::new(450, 2),
            start_date: NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2024, 1, 18).unwrap(),
        }]);
        assert_eq!(
            reason.to_string(),
            "Member has an active penalty: 4.50 from 2024-01-15 to 2024-01-18"
        );
    }
}
