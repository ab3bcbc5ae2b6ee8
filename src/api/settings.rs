//! Settings endpoints

use axum::{extract::State, Json};

use crate::{error::AppResult, models::settings::LendingSettings, AppState};

/// Get current settings
#[utoipa::path(
    get,
    path = "/settings",
    tag = "settings",
    responses(
        (status = 200, description = "Current settings", body = LendingSettings)
    )
)]
pub async fn get_settings(State(state): State<AppState>) -> AppResult<Json<LendingSettings>> {
    let settings = state.services.settings.current().await?;
    Ok(Json(settings))
}

/// Replace the lending settings
#[utoipa::path(
    put,
    path = "/settings",
    tag = "settings",
    request_body = LendingSettings,
    responses(
        (status = 200, description = "Settings updated", body = LendingSettings),
        (status = 400, description = "Invalid settings", body = crate::error::ErrorResponse)
    )
)]
pub async fn update_settings(
    State(state): State<AppState>,
    Json(request): Json<LendingSettings>,
) -> AppResult<Json<LendingSettings>> {
    let settings = state.services.settings.update(request).await?;
    Ok(Json(settings))
}
