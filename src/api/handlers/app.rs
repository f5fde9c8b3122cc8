//! Rider endpoints: request, evaluate, and cancel rides.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::routing::post;
use axum::{Json, Router};
use uuid::Uuid;

use crate::api::auth::AuthenticatedUser;
use crate::api::dto::{CreateRideRequest, CreateRideResponse, EvaluationRequest, EvaluationResponse};
use crate::api::json::ValidatedJson;
use crate::app_state::AppState;
use crate::domain::RideId;
use crate::error::{ErrorResponse, ServiceError};

/// `POST /api/app/rides`: Request a ride.
///
/// # Errors
///
/// Returns [`ServiceError::Conflict`] when the rider already has a ride
/// in progress.
#[utoipa::path(
    post,
    path = "/api/app/rides",
    tag = "App",
    summary = "Request a ride",
    request_body = CreateRideRequest,
    security(("bearer" = [])),
    responses(
        (status = 202, description = "Ride queued for dispatch", body = CreateRideResponse),
        (status = 401, description = "Unknown user token", body = ErrorResponse),
        (status = 409, description = "Ride already in progress", body = ErrorResponse),
    )
)]
pub async fn create_ride(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    ValidatedJson(req): ValidatedJson<CreateRideRequest>,
) -> Result<impl IntoResponse, ServiceError> {
    let requested = state
        .rides
        .request_ride(user_id, req.pickup_coordinate, req.destination_coordinate)
        .await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(CreateRideResponse {
            ride_id: requested.ride_id.into(),
            fare: requested.fare,
        }),
    ))
}

/// `POST /api/app/rides/{ride_id}/evaluation`: Rate the ride and pay.
///
/// # Errors
///
/// Returns [`ServiceError`] for an out-of-range rating, an unknown ride,
/// a ride that has not arrived, or a payment that could not be
/// confirmed. Nothing is recorded on error.
#[utoipa::path(
    post,
    path = "/api/app/rides/{ride_id}/evaluation",
    tag = "App",
    summary = "Evaluate and pay for a ride",
    params(("ride_id" = Uuid, Path, description = "Ride identifier")),
    request_body = EvaluationRequest,
    security(("bearer" = [])),
    responses(
        (status = 200, description = "Ride completed and paid", body = EvaluationResponse),
        (status = 400, description = "Evaluation out of range", body = ErrorResponse),
        (status = 404, description = "Ride or payment token not found", body = ErrorResponse),
        (status = 409, description = "Ride has not arrived", body = ErrorResponse),
        (status = 502, description = "Payment rejected", body = ErrorResponse),
        (status = 503, description = "Payment gateway unreachable", body = ErrorResponse),
    )
)]
pub async fn post_evaluation(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(ride_id): Path<Uuid>,
    ValidatedJson(req): ValidatedJson<EvaluationRequest>,
) -> Result<Json<EvaluationResponse>, ServiceError> {
    let settlement = state
        .settlement
        .submit_evaluation(user_id, RideId::from_uuid(ride_id), req.evaluation)
        .await?;
    Ok(Json(EvaluationResponse {
        fare: settlement.fare,
        completed_at: settlement.completed_at.timestamp_millis(),
    }))
}

/// `POST /api/app/rides/{ride_id}/cancel`: Abandon a ride.
///
/// # Errors
///
/// Returns [`ServiceError::NotFound`] for an unknown ride and
/// [`ServiceError::Conflict`] for a finished one.
#[utoipa::path(
    post,
    path = "/api/app/rides/{ride_id}/cancel",
    tag = "App",
    summary = "Cancel a ride",
    params(("ride_id" = Uuid, Path, description = "Ride identifier")),
    security(("bearer" = [])),
    responses(
        (status = 204, description = "Ride canceled"),
        (status = 404, description = "Ride not found", body = ErrorResponse),
        (status = 409, description = "Ride already finished", body = ErrorResponse),
    )
)]
pub async fn cancel_ride(
    State(state): State<AppState>,
    AuthenticatedUser(user_id): AuthenticatedUser,
    Path(ride_id): Path<Uuid>,
) -> Result<StatusCode, ServiceError> {
    state
        .rides
        .cancel_ride(user_id, RideId::from_uuid(ride_id))
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

/// Rider routes.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/app/rides", post(create_ride))
        .route("/app/rides/{ride_id}/evaluation", post(post_evaluation))
        .route("/app/rides/{ride_id}/cancel", post(cancel_ride))
}
