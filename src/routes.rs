use axum::Router;
use axum::extract::DefaultBodyLimit;
use axum::http::header::{AUTHORIZATION, CONTENT_TYPE};
use axum::http::{HeaderValue, Method};
use axum::middleware::from_fn_with_state;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use std::any::Any;
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{Any as AnyOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, warn};

use crate::error::ApiError;
use crate::handlers;
use crate::middleware::{rate_limit, require_api_key};
use crate::state::AppState;

/// Listed by `GET /` and in 404 bodies.
pub const ENDPOINTS: &[&str] = &[
    "GET /",
    "GET /status",
    "POST /test-sms",
    "POST /send-sms",
    "POST /webhook/sms-status",
];

pub fn router(state: AppState) -> Router {
    let api_key = from_fn_with_state(state.clone(), require_api_key);
    let limiter = from_fn_with_state(state.clone(), rate_limit);
    let cors = cors_layer(state.config.server.allowed_origin.as_deref());
    let body_limit = DefaultBodyLimit::max(state.config.security.max_body_size);

    Router::new()
        .route("/", get(handlers::index))
        .route("/status", get(handlers::status))
        .route(
            "/test-sms",
            post(handlers::test_sms).route_layer(api_key.clone()),
        )
        // outermost runs first: rate limit, then API key
        .route(
            "/send-sms",
            post(handlers::send_sms)
                .route_layer(api_key)
                .route_layer(limiter),
        )
        .route("/webhook/sms-status", post(handlers::sms_status))
        .fallback(handlers::not_found)
        .method_not_allowed_fallback(handlers::not_found)
        .layer(body_limit)
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

fn cors_layer(allowed_origin: Option<&str>) -> CorsLayer {
    let layer = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION]);

    match allowed_origin.filter(|origin| *origin != "*") {
        None => layer.allow_origin(AnyOrigin),
        Some(origin) => match HeaderValue::from_str(origin) {
            Ok(value) => layer.allow_origin(value),
            Err(_) => {
                warn!(origin, "Unusable ALLOWED_ORIGIN; cross-origin requests will be refused");
                layer
            }
        },
    }
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Handler panicked");
    ApiError::Internal { details: None }.into_response()
}
