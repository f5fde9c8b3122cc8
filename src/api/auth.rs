//! Bearer-token extractors for the chair and rider endpoints.
//!
//! Tokens are opaque strings issued elsewhere; they are only looked up.

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::app_state::AppState;
use crate::domain::{Chair, UserId};
use crate::error::ServiceError;

/// The chair owning the request's bearer token.
#[derive(Debug, Clone)]
pub struct AuthenticatedChair(pub Chair);

/// The user owning the request's bearer token.
#[derive(Debug, Clone, Copy)]
pub struct AuthenticatedUser(pub UserId);

fn bearer_token(parts: &Parts) -> Result<String, ServiceError> {
    parts
        .headers
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .map(str::to_string)
        .ok_or_else(|| ServiceError::Unauthorized("missing bearer token".to_string()))
}

impl FromRequestParts<AppState> for AuthenticatedChair {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state
            .store
            .chair_by_token(&token)
            .await?
            .map(Self)
            .ok_or_else(|| ServiceError::Unauthorized("unknown chair token".to_string()))
    }
}

impl FromRequestParts<AppState> for AuthenticatedUser {
    type Rejection = ServiceError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = bearer_token(parts)?;
        state
            .store
            .user_by_token(&token)
            .await?
            .map(Self)
            .ok_or_else(|| ServiceError::Unauthorized("unknown user token".to_string()))
    }
}

#[cfg(test)]
mod tests {
    use axum::http::Request;

    use super::*;

    fn parts(header: Option<&str>) -> Parts {
        let mut builder = Request::builder().uri("/");
        if let Some(value) = header {
            builder = builder.header(AUTHORIZATION, value);
        }
        match builder.body(()) {
            Ok(request) => request.into_parts().0,
            Err(_) => Request::new(()).into_parts().0,
        }
    }

    #[test]
    fn extracts_the_token_after_the_scheme() {
        assert!(matches!(bearer_token(&parts(Some("Bearer abc"))).as_deref(), Ok("abc")));
    }

    #[test]
    fn rejects_missing_or_foreign_schemes() {
        for header in [None, Some("Basic abc"), Some("Bearer "), Some("abc")] {
            assert!(
                matches!(bearer_token(&parts(header)), Err(ServiceError::Unauthorized(_))),
                "{header:?}"
            );
        }
    }
}
