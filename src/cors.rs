use axum::http::{
    header::{ACCEPT, CONTENT_TYPE, ORIGIN},
    Method,
};
use tower_http::cors::{AllowOrigin, CorsLayer};

/// CORS headers for all responses.
///
/// Credentialed requests require the allowed origin to match the request
/// origin, so the request's origin is mirrored back.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_methods([Method::GET, Method::OPTIONS, Method::POST, Method::PUT])
        .allow_headers([ACCEPT, CONTENT_TYPE, ORIGIN])
        .allow_credentials(true)
}
