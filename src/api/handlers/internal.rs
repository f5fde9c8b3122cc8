//! Internal endpoints invoked by the platform, not by clients.

use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::get;
use axum::Router;

use crate::app_state::AppState;
use crate::error::{ErrorResponse, ServiceError};
use crate::service::CycleOutcome;

/// `GET /api/internal/matching`: Run one dispatch cycle.
///
/// Answers `204` whether the cycle ran or was skipped because another
/// one was in progress.
///
/// # Errors
///
/// Returns [`ServiceError::Persistence`] when the cycle could not load
/// its working set.
#[utoipa::path(
    get,
    path = "/api/internal/matching",
    tag = "Internal",
    summary = "Trigger a dispatch cycle",
    description = "Matches waiting rides to available chairs. Concurrent triggers are coalesced.",
    responses(
        (status = 204, description = "Cycle finished or skipped"),
        (status = 500, description = "Store unavailable", body = ErrorResponse),
    )
)]
pub async fn trigger_matching(State(state): State<AppState>) -> Result<StatusCode, ServiceError> {
    if let CycleOutcome::Completed(report) = state.dispatch.run_cycle().await? {
        tracing::debug!(assigned = report.assigned, "matching triggered");
    }
    Ok(StatusCode::NO_CONTENT)
}

/// Internal routes.
pub fn routes() -> Router<AppState> {
    Router::new().route("/internal/matching", get(trigger_matching))
}
