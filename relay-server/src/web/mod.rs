//! Web server module.
//!
//! Exposes the OTP endpoints, the webhook relay and a health probe, with
//! permissive CORS so the storefront can call it from any origin.

pub mod error;
pub mod handlers;

use axum::{
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        Method,
    },
    routing::{get, post},
    Router,
};
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};

pub use error::{AppError, ErrorResponse};
pub use handlers::{
    health, index, not_found, send_otp, submit, verify_otp, webhook, AppState, HealthResponse,
    MessageResponse, SubmissionResponse,
};

/// Cross-origin policy applied to every route, preflight included.
pub fn cors_layer() -> CorsLayer {
    CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
}

/// Build the application router.
pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/", get(index))
        .route("/health", get(health))
        .route("/send-otp", post(send_otp))
        .route("/verify-otp", post(verify_otp))
        .route("/webhook/:channel", post(webhook))
        .route("/api/:collection", post(submit))
        .fallback(not_found)
        .layer(cors_layer())
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
