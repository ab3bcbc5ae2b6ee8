//! Reservation endpoints

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::Deserialize;
use utoipa::ToSchema;

use crate::{error::AppResult, models::reservation::Reservation, AppState};

use super::today;

/// Create reservation request
#[derive(Debug, Deserialize, ToSchema)]
pub struct CreateReservationRequest {
    /// Catalog item to reserve; the copy is chosen by the server
    pub item_id: i32,
    pub member_id: i32,
}

/// Reserve an item
#[utoipa::path(
    post,
    path = "/reservations",
    tag = "reservations",
    request_body = CreateReservationRequest,
    responses(
        (status = 201, description = "Reservation created", body = Reservation),
        (status = 403, description = "Member not eligible", body = crate::error::ErrorResponse),
        (status = 404, description = "Member not found", body = crate::error::ErrorResponse),
        (status = 409, description = "No available copy or already reserved", body = crate::error::ErrorResponse)
    )
)]
pub async fn create_reservation(
    State(state): State<AppState>,
    Json(request): Json<CreateReservationRequest>,
) -> AppResult<(StatusCode, Json<Reservation>)> {
    let settings = state.services.settings.current().await?;
    let reservation = state
        .services
        .reservations
        .create(&settings, request.item_id, request.member_id, today())
        .await?;
    Ok((StatusCode::CREATED, Json(reservation)))
}

/// List pending reservations, oldest first
#[utoipa::path(
    get,
    path = "/reservations",
    tag = "reservations",
    responses(
        (status = 200, description = "Pending reservations", body = Vec<Reservation>)
    )
)]
pub async fn list_pending(State(state): State<AppState>) -> AppResult<Json<Vec<Reservation>>> {
    let reservations = state.services.reservations.pending().await?;
    Ok(Json(reservations))
}

/// Get a reservation
#[utoipa::path(
    get,
    path = "/reservations/{id}",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation", body = Reservation),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse)
    )
)]
pub async fn get_reservation(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.get_reservation(reservation_id).await?;
    Ok(Json(reservation))
}

/// Mark a pending reservation ready for pickup
#[utoipa::path(
    post,
    path = "/reservations/{id}/fulfill",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation fulfilled", body = Reservation),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Reservation is not pending", body = crate::error::ErrorResponse)
    )
)]
pub async fn fulfill(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.fulfill(reservation_id).await?;
    Ok(Json(reservation))
}

/// Reject a pending reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/reject",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation rejected", body = Reservation),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Reservation is not pending", body = crate::error::ErrorResponse)
    )
)]
pub async fn reject(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.reject(reservation_id).await?;
    Ok(Json(reservation))
}

/// Cancel a pending or fulfilled reservation
#[utoipa::path(
    post,
    path = "/reservations/{id}/cancel",
    tag = "reservations",
    params(
        ("id" = i32, Path, description = "Reservation ID")
    ),
    responses(
        (status = 200, description = "Reservation cancelled", body = Reservation),
        (status = 404, description = "Reservation not found", body = crate::error::ErrorResponse),
        (status = 409, description = "Reservation already closed", body = crate::error::ErrorResponse)
    )
)]
pub async fn cancel(
    State(state): State<AppState>,
    Path(reservation_id): Path<i32>,
) -> AppResult<Json<Reservation>> {
    let reservation = state.services.reservations.cancel(reservation_id).await?;
    Ok(Json(reservation))
}

/// Expire reservations whose pickup window has passed
#[utoipa::path(
    post,
    path = "/reservations/expire",
    tag = "reservations",
    responses(
        (status = 200, description = "Reservations expired by this run", body = Vec<Reservation>)
    )
)]
pub async fn sweep_expired(State(state): State<AppState>) -> AppResult<Json<Vec<Reservation>>> {
    let expired = state.services.reservations.sweep_expired(today()).await?;
    Ok(Json(expired))
}
