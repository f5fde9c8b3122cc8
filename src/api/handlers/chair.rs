//! Chair endpoints: position reports and ride status updates.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::auth::AuthenticatedChair;
use crate::api::dto::{CoordinateResponse, RideStatusRequest};
use crate::api::json::ValidatedJson;
use crate::app_state::AppState;
use crate::domain::{Coordinate, RideId};
use crate::error::{ErrorResponse, ServiceError};

/// `POST /api/chair/coordinate`: Report the chair's position.
///
/// # Errors
///
/// Returns [`ServiceError`] on authentication or store failure.
#[utoipa::path(
    post,
    path = "/api/chair/coordinate",
    tag = "Chair",
    summary = "Report chair position",
    description = "Moves the chair, updates its odometer, and advances its current ride when the pickup or destination is reached.",
    request_body = Coordinate,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Position recorded", body = CoordinateResponse),
        (status = 401, description = "Unknown chair token", body = ErrorResponse),
    )
)]
pub async fn post_coordinate(
    State(state): State<AppState>,
    AuthenticatedChair(chair): AuthenticatedChair,
    ValidatedJson(position): ValidatedJson<Coordinate>,
) -> Result<Json<CoordinateResponse>, ServiceError> {
    let report = state.locations.report_coordinate(chair.id, position).await?;
    Ok(Json(CoordinateResponse {
        recorded_at: report.recorded_at.timestamp_millis(),
    }))
}

/// `POST /api/chair/rides/{ride_id}/status`: Accept a ride or confirm
/// boarding.
///
/// # Errors
///
/// Returns [`ServiceError`] when the status is not one a chair reports,
/// the ride is not assigned to the chair, or the ride is not in the
/// preceding status.
#[utoipa::path(
    post,
    path = "/api/chair/rides/{ride_id}/status",
    tag = "Chair",
    summary = "Update ride status",
    params(("ride_id" = Uuid, Path, description = "Ride identifier")),
    request_body = RideStatusRequest,
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Status appended"),
        (status = 400, description = "Status not reportable by a chair", body = ErrorResponse),
        (status = 404, description = "Ride not assigned to this chair", body = ErrorResponse),
        (status = 409, description = "Ride is not in the preceding status", body = ErrorResponse),
    )
)]
pub async fn post_ride_status(
    State(state): State<AppState>,
    AuthenticatedChair(chair): AuthenticatedChair,
    Path(ride_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<RideStatusRequest>,
) -> Result<StatusCode, ServiceError> {
    state
        .rides
        .update_ride_status(&chair, RideId::from_uuid(ride_id), req.status)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Chair routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/chair/coordinate", post(post_coordinate))
        .route("/chair/rides/{ride_id}/status", post(post_ride_status))
}
