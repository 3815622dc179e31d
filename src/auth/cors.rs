//! CORS policy.
//!
//! Every origin, method and header is accepted with credentials. The request
//! origin is mirrored back since a literal `*` is not allowed together with
//! credentials. This disables origin restriction entirely.

use std::time::Duration;

use axum::http::header;
use tower_http::cors::{AllowHeaders, AllowMethods, AllowOrigin, CorsLayer};

/// How long browsers may cache a preflight result.
const PREFLIGHT_MAX_AGE: Duration = Duration::from_secs(30 * 60);

pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods(AllowMethods::mirror_request())
        .allow_headers(AllowHeaders::mirror_request())
        .allow_credentials(true)
        .expose_headers([header::AUTHORIZATION])
        .max_age(PREFLIGHT_MAX_AGE)
}
