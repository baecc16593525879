use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// Browser front-ends post passages and uploads from any origin; only the
/// verbs and headers the MCQ routes use are let through.
pub fn permissive_cors() -> CorsLayer {
    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
        .allow_origin(Any)
}
