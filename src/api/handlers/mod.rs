//! REST endpoint handlers organized by caller.

pub mod app;
pub mod chair;
pub mod internal;
pub mod system;

use axum::Router;

use crate::app_state::AppState;

/// Composes all caller routes under `/api`.
pub fn routes() -> Router<AppState> {
    Router::new()
        .merge(internal::routes())
        .merge(chair::routes())
        .merge(app::routes())
}
