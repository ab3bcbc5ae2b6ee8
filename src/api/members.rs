//! Per-member lending views

use axum::{
    extract::{Path, Query, State},
    Json,
};
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::{
    error::AppResult,
    models::{loan::Loan, penalty::Penalty, reservation::Reservation},
    services::eligibility::EligibilityReport,
    AppState,
};

use super::today;

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct AsOfQuery {
    /// Date to evaluate (defaults to today)
    pub as_of: Option<NaiveDate>,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct MemberLoansQuery {
    /// Only loans not yet returned
    #[serde(default)]
    pub open_only: bool,
}

/// Penalties blocking a member, with the sum of everything still active
#[derive(Serialize, ToSchema)]
pub struct MemberPenalties {
    pub member_id: i32,
    #[schema(value_type = String)]
    pub active_total: Decimal,
    pub blocking: Vec<Penalty>,
}

/// Check whether a member may borrow, reserve or extend
#[utoipa::path(
    get,
    path = "/members/{id}/eligibility",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID"),
        AsOfQuery
    ),
    responses(
        (status = 200, description = "Eligibility verdict", body = EligibilityReport),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_eligibility(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<EligibilityReport>> {
    let as_of = query.as_of.unwrap_or_else(today);
    let settings = state.services.settings.current().await?;
    let report = state.services.eligibility.report(&settings, member_id, as_of).await?;
    Ok(Json(report))
}

/// Loans of a member, newest first
#[utoipa::path(
    get,
    path = "/members/{id}/loans",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID"),
        MemberLoansQuery
    ),
    responses(
        (status = 200, description = "Member's loans", body = Vec<Loan>)
    )
)]
pub async fn get_member_loans(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
    Query(query): Query<MemberLoansQuery>,
) -> AppResult<Json<Vec<Loan>>> {
    let loans = state.services.loans.member_loans(member_id, query.open_only).await?;
    Ok(Json(loans))
}

/// Pending and fulfilled reservations of a member
#[utoipa::path(
    get,
    path = "/members/{id}/reservations",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID")
    ),
    responses(
        (status = 200, description = "Member's active reservations", body = Vec<Reservation>)
    )
)]
pub async fn get_member_reservations(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.member_reservations(member_id).await?;
    Ok(Json(reservations))
}

/// Penalties of a member active on a date
#[utoipa::path(
    get,
    path = "/members/{id}/penalties",
    tag = "members",
    params(
        ("id" = i32, Path, description = "Member ID"),
        AsOfQuery
    ),
    responses(
        (status = 200, description = "Member's penalties", body = MemberPenalties)
    )
)]
pub async fn get_member_penalties(
    State(state): State<AppState>,
    Path(member_id): Path<i32>,
    Query(query): Query<AsOfQuery>,
) -> AppResult<Json<MemberPenalties>> {
    let as_of = query.as_of.unwrap_or_else(today);
    let blocking = state.services.penalties.active_for_member(member_id, as_of).await?;
    let active_total = state.services.penalties.active_total(Some(member_id)).await?;
    Ok(Json(MemberPenalties {
        member_id,
        active_total,
        blocking,
    }))
}
