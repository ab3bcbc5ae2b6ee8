//! Loan management endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use utoipa::ToSchema;
use validator::Validate;

use crate::{
    error::AppResult,
    models::loan::{CreateLoan, Loan, ReturnOutcome},
    AppState,
};

use super::today;

/// Return request
#[derive(Debug, Default, Deserialize, ToSchema)]
pub struct ReturnLoanRequest {
    /// Defaults to today
    pub return_date: Option<NaiveDate>,
}

/// Extension request
#[derive(Debug, Deserialize, Validate, ToSchema)]
pub struct ExtendLoanRequest {
    /// Days added to the due date
    #[validate(range(min = 1))]
    pub extra_days: i32,
}

/// Reminder sweep request
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct RemindersRequest {
    /// Defaults to the configured reminder lead
    #[validate(range(min = 0, max = 365))]
    pub lead_days: Option<i32>,
}

#[derive(Serialize, ToSchema)]
pub struct RemindersResponse {
    /// Number of reminders sent
    pub sent: usize,
}

/// Create a new loan (borrow a copy)
#[utoipa::path(
    post,
    path = "/loans",
    tag = "loans",
    request_body = CreateLoan,
    responses(
        (status = 201, description = "Loan created", body = Loan),
        (status = 400, description = "Invalid request", body = crate::error::ErrorResponse),
        (status = 403, description = "Member not eligible", body = crate::error::ErrorResponse),
        (status = 404, description = "Member or copy not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Copy already on loan", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_loan(
    State(state): State<AppState>,
    Json(request): Json<CreateLoan>,
) -> AppResult<(StatusCode, Json<Loan>)> {
    request.validate()?;

    let settings = state.services.settings.current().await?;
    let loan = state.services.loans.create_loan(&settings, request, today()).await?;
    Ok((StatusCode::CREATED, Json(loan)))
}

/// List open loans, earliest due date first
#[utoipa::path(
    get,
    path = "/loans",
    tag = "loans",
    responses(
        (status = 200, description = "Open loans", body = Vec<Loan>)
    )
)]
pub async fn list_open_loans(State(state): State<AppState>) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.open_loans().await?;
    Ok(Json(loans))
}

/// List open loans flagged late
#[utoipa::path(
    get,
    path = "/loans/late",
    tag = "loans",
    responses(
        (status = 200, description = "Late loans", body = Vec<Loan>)
    )
)]
pub async fn list_late_loans(State(state): State<AppState>) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.late_loans().await?;
    Ok(Json(loans))
}

/// Get a loan
#[utoipa::path(
    get,
    path = "/loans/{id}",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    responses(
        (status = 200, description = "Loan", body = Loan),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
) -> AppResult<Json<Loan>> {
    let loan = state.services.loans.get_loan(loan_id).await?;
    Ok(Json(loan))
}

/// Return a borrowed copy
#[utoipa::path(
    post,
    path = "/loans/{id}/return",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body(content = ReturnLoanRequest, description = "Optional return date"),
    responses(
        (status = 200, description = "Copy returned", body = ReturnOutcome),
        (status = 400, description = "Return date before loan start", body = crate::error::ErrorResponse),
        (status = 404, description = "Loan not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Already returned", body = crate::error::ErrorResponse)
    )
)]
pub async fn return_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
    request: Option<Json<ReturnLoanRequest>>,
) -> AppResult<Json<ReturnOutcome>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    let return_date = request.return_date.unwrap_or_else(today);

    let settings = state.services.settings.current().await?;
    let outcome = state.services.loans.return_loan(&settings, loan_id, return_date).await?;
    Ok(Json(outcome))
}

/// Extend a loan
#[utoipa::path(
    post,
    path = "/loans/{id}/extend",
    tag = "loans",
    params(
        ("id" = i32, Path, description = "Loan ID")
    ),
    request_body = ExtendLoanRequest,
    responses(
        (status = 200, description = "Loan extended", body = Loan),
        (status = 400, description = "Invalid extension", body = crate::error::ErrorResponse),
        (status = 403, description = "Member not eligible", body = crate::error::ErrorResponse),
        (status = 409, description = "Loan already returned", body = crate::error::ErrorResponse),
        (status = 422, description = "Extension rules violated", body = crate::error::ErrorResponse)
    )
)]
pub async fn extend_loan(
    State(state): State<AppState>,
    Path(loan_id): Path<i32>,
    Json(request): Json<ExtendLoanRequest>,
) -> AppResult<Json<Loan>> {
    request.validate()?;

    let settings = state.services.settings.current().await?;
    let loan = state
        .services
        .loans
        .extend_loan(&settings, loan_id, request.extra_days, today())
        .await?;
    Ok(Json(loan))
}

/// Flag overdue loans and send late notices
#[utoipa::path(
    post,
    path = "/loans/overdue",
    tag = "loans",
    responses(
        (status = 200, description = "Loans flagged by this run", body = Vec<Loan>)
    )
)]
pub async fn mark_overdue(State(state): State<AppState>) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.mark_overdue(today()).await?;
    Ok(Json(loans))
}

/// Send reminders for loans due soon
#[utoipa::path(
    post,
    path = "/loans/reminders",
    tag = "loans",
    request_body(content = RemindersRequest, description = "Optional lead time"),
    responses(
        (status = 200, description = "Reminders sent", body = RemindersResponse)
    )
)]
pub async fn send_reminders(
    State(state): State<AppState>,
    request: Option<Json<RemindersRequest>>,
) -> AppResult<Json<RemindersResponse>> {
    let request = request.map(|Json(r)| r).unwrap_or_default();
    request.validate()?;

    let lead_days = match request.lead_days {
        Some(days) => days,
        None => state.services.settings.current().await?.reminder_lead_days,
    };
    let sent = state.services.loans.send_reminders(today(), lead_days).await?;
    Ok(Json(RemindersResponse { sent }))
}
