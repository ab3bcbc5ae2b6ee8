//! OpenAPI documentation

use axum::Router;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::api::{health, loans, members, penalties, reservations, settings};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Lending API",
        version = "1.0.0",
        description = "Loans, reservations and penalties of a lending facility",
        license(name = "AGPL-3.0", url = "https://www.gnu.org/licenses/agpl-3.0.html")
    ),
    servers(
        (url = "/api/v1", description = "API v1")
    ),
    paths(
        // Health
        health::health_check,
        health::readiness_check,
        // Loans
        loans::create_loan,
        loans::list_open_loans,
        loans::list_late_loans,
        loans::get_loan,
        loans::return_loan,
        loans::extend_loan,
        loans::mark_overdue,
        loans::send_reminders,
        // Reservations
        reservations::create_reservation,
        reservations::list_pending,
        reservations::get_reservation,
        reservations::fulfill,
        reservations::reject,
        reservations::cancel,
        reservations::sweep_expired,
        // Penalties
        penalties::list_penalties,
        penalties::get_totals,
        penalties::get_penalty,
        penalties::mark_paid,
        penalties::cancel,
        // Members
        members::get_eligibility,
        members::get_member_loans,
        members::get_member_reservations,
        members::get_member_penalties,
        // Settings
        settings::get_settings,
        settings::update_settings,
    ),
    components(
        schemas(
            // Loans
            crate::models::loan::Loan,
            crate::models::loan::LoanStatus,
            crate::models::loan::CreateLoan,
            crate::models::loan::ReturnOutcome,
            crate::models::enums::LoanType,
            loans::ReturnLoanRequest,
            loans::ExtendLoanRequest,
            loans::RemindersRequest,
            loans::RemindersResponse,
            // Reservations
            crate::models::reservation::Reservation,
            crate::models::reservation::ReservationStatus,
            reservations::CreateReservationRequest,
            // Penalties
            crate::models::penalty::Penalty,
            crate::models::penalty::PenaltyStatus,
            crate::models::penalty::PenaltyTotals,
            // Members
            crate::models::enums::MembershipTier,
            crate::services::eligibility::EligibilityReport,
            crate::error::BlockingPenalty,
            members::MemberPenalties,
            // Settings
            crate::models::settings::LendingSettings,
            crate::models::settings::TierQuotas,
            // Health
            health::HealthResponse,
            // Errors
            crate::error::ErrorResponse,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
        (name = "loans", description = "Loan lifecycle"),
        (name = "reservations", description = "Reservation lifecycle"),
        (name = "penalties", description = "Penalty ledger"),
        (name = "members", description = "Per-member lending views"),
        (name = "settings", description = "Lending settings")
    )
)]
pub struct ApiDoc;

/// Create the OpenAPI documentation router
pub fn create_openapi_router() -> Router {
    Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
}
