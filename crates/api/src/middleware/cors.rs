use axum::http::{header, Method};
use tower_http::cors::{Any, CorsLayer};

/// The browser editor calls the API cross-origin with JSON bodies.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT])
}
