//! REST API layer: route handlers, DTOs, extractors, and router
//! composition.
//!
//! Caller endpoints are mounted under `/api`; `/health` sits at the root.

pub mod auth;
pub mod dto;
pub mod handlers;
pub mod json;

use axum::Router;

use crate::app_state::AppState;

/// Builds the complete API router with all REST endpoints.
pub fn build_router() -> Router<AppState> {
    Router::new()
        .nest("/api", handlers::routes())
        .merge(handlers::system::routes())
}
