//! Penalty ledger endpoints

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;
use utoipa::IntoParams;

use crate::{
    error::AppResult,
    models::penalty::{Penalty, PenaltyStatus, PenaltyTotals},
    AppState,
};

/// Query parameters for the penalty list
#[derive(Debug, Default, Deserialize, IntoParams)]
pub struct PenaltyQuery {
    /// Only penalties in this status (active, paid, cancelled)
    pub status: Option<PenaltyStatus>,
}

/// List penalties, newest first
#[utoipa::path(
    get,
    path = "/penalties",
    tag = "penalties",
    params(PenaltyQuery),
    responses(
        (status = 200, description = "Penalties", body = Vec<Penalty>)
    )
)]
pub async fn list_penalties(
    State(state): State<AppState>,
    Query(query): Query<PenaltyQuery>,
) -> AppResult<Json<Vec<Penalty>>> {
    let penalties = state.services.penalties.list(query.status).await?;
    Ok(Json(penalties))
}

/// Active and paid totals
#[utoipa::path(
    get,
    path = "/penalties/totals",
    tag = "penalties",
    responses(
        (status = 200, description = "Ledger totals", body = PenaltyTotals)
    )
)]
pub async fn get_totals(State(state): State<AppState>) -> AppResult<Json<PenaltyTotals>> {
    let totals = state.services.penalties.totals().await?;
    Ok(Json(totals))
}

/// Get a penalty
#[utoipa::path(
    get,
    path = "/penalties/{id}",
    tag = "penalties",
    params(
        ("id" = i32, Path, description = "Penalty ID")
    ),
    responses(
        (status = 200, description = "Penalty", body = Penalty),
        (status = 404, description = "Penalty not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_penalty(
    State(state): State<AppState>,
    Path(penalty_id): Path<i32>,
) -> AppResult<Json<Penalty>> {
    let penalty = state.services.penalties.get_penalty(penalty_id).await?;
    Ok(Json(penalty))
}

/// Mark an active penalty as paid
#[utoipa::path(
    post,
    path = "/penalties/{id}/pay",
    tag = "penalties",
    params(
        ("id" = i32, Path, description = "Penalty ID")
    ),
    responses(
        (status = 200, description = "Penalty paid", body = Penalty),
        (status = 404, description = "Penalty not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Penalty already paid or cancelled", body = crate::error::ErrorResponse)
    )
)]
pub async fn mark_paid(
    State(state): State<AppState>,
    Path(penalty_id): Path<i32>,
) -> AppResult<Json<Penalty>> {
    let penalty = state.services.penalties.mark_paid(penalty_id).await?;
    Ok(Json(penalty))
}

/// Cancel an active penalty
#[utoipa::path(
    post,
    path = "/penalties/{id}/cancel",
    tag = "penalties",
    params(
        ("id" = i32, Path, description = "Penalty ID")
    ),
    responses(
        (status = 200, description = "Penalty cancelled", body = Penalty),
        (status = 404, description = "Penalty not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Penalty already paid or cancelled", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    Path(penalty_id): Path<i32>,
) -> AppResult<Json<Penalty>> {
    let penalty = state.services.penalties.cancel(penalty_id).await?;
    Ok(Json(penalty))
}
