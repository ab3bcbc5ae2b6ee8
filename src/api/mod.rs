//! API handlers for the lending REST endpoints

pub mod health;
pub mod loans;
pub mod members;
pub mod openapi;
pub mod penalties;
pub mod reservations;
pub mod settings;

use axum::{
    routing::{get, post},
    Router,
};
use chrono::NaiveDate;

use crate::AppState;

/// Calendar date used for decisions made "now"
pub(crate) fn today() -> NaiveDate {
    chrono::Local::now().date_naive()
}

/// Routes mounted under `/api/v1`
pub fn routes(state: AppState) -> Router {
    Router::new()
        // Loans
        .route("/loans", get(loans::list_open_loans).post(loans::create_loan))
        .route("/loans/late", get(loans::list_late_loans))
        .route("/loans/overdue", post(loans::mark_overdue))
        .route("/loans/reminders", post(loans::send_reminders))
        .route("/loans/:id", get(loans::get_loan))
        .route("/loans/:id/return", post(loans::return_loan))
        .route("/loans/:id/extend", post(loans::extend_loan))
        // Reservations
        .route(
            "/reservations",
            get(reservations::list_pending).post(reservations::create_reservation),
        )
        .route("/reservations/expire", post(reservations::sweep_expired))
        .route("/reservations/:id", get(reservations::get_reservation))
        .route("/reservations/:id/fulfill", post(reservations::fulfill))
        .route("/reservations/:id/reject", post(reservations::reject))
        .route("/reservations/:id/cancel", post(reservations::cancel))
        // Penalties
        .route("/penalties", get(penalties::list_penalties))
        .route("/penalties/totals", get(penalties::get_totals))
        .route("/penalties/:id", get(penalties::get_penalty))
        .route("/penalties/:id/pay", post(penalties::mark_paid))
        .route("/penalties/:id/cancel", post(penalties::cancel))
        // Members
        .route("/members/:id/eligibility", get(members::get_eligibility))
        .route("/members/:id/loans", get(members::get_member_loans))
        .route("/members/:id/reservations", get(members::get_member_reservations))
        .route("/members/:id/penalties", get(members::get_member_penalties))
        // Settings
        .route("/settings", get(settings::get_settings).put(settings::update_settings))
        .with_state(state)
}
