//! OpenAPI document for the REST API.

use utoipa::openapi::security::{Http, HttpAuthScheme, SecurityScheme};
use utoipa::{Modify, OpenApi};

/// Registers the bearer token scheme used by the chair and rider
/// endpoints.
#[derive(Debug)]
struct BearerAddon;

impl Modify for BearerAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi
            .components
            .get_or_insert_with(utoipa::openapi::Components::default);
        components.add_security_scheme("bearer", SecurityScheme::Http(Http::new(HttpAuthScheme::Bearer)));
    }
}

/// OpenAPI document served by Swagger UI when the `swagger-ui` feature is
/// enabled.
#[derive(Debug, OpenApi)]
#[openapi(
    modifiers(&BearerAddon),
    info(
        title = "ride-dispatch",
        description = "Ride dispatch, chair tracking, and payment settlement."
    ),
    paths(
        crate::api::handlers::system::health_handler,
        crate::api::handlers::internal::trigger_matching,
        crate::api::handlers::chair::post_coordinate,
        crate::api::handlers::chair::post_ride_status,
        crate::api::handlers::app::create_ride,
        crate::api::handlers::app::post_evaluation,
        crate::api::handlers::app::cancel_ride,
    ),
    components(schemas(crate::error::ErrorResponse, crate::error::ErrorBody)),
    tags(
        (name = "System", description = "Health"),
        (name = "Internal", description = "Platform triggers"),
        (name = "Chair", description = "Chair-facing operations"),
        (name = "App", description = "Rider-facing operations")
    )
)]
pub struct ApiDoc;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_route_is_documented() {
        let doc = ApiDoc::openapi();
        for path in [
            "/health",
            "/api/internal/matching",
            "/api/chair/coordinate",
            "/api/chair/rides/{ride_id}/status",
            "/api/app/rides",
            "/api/app/rides/{ride_id}/evaluation",
            "/api/app/rides/{ride_id}/cancel",
        ] {
            assert!(doc.paths.paths.contains_key(path), "{path} missing");
        }
    }

    #[test]
    fn bearer_scheme_is_registered() {
        let doc = ApiDoc::openapi();
        let registered = doc
            .components
            .as_ref()
            .is_some_and(|c| c.security_schemes.contains_key("bearer"));
        assert!(registered);
    }
}
