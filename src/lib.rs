//! # SMS Gateway
//!
//! A small HTTP service that validates SMS send requests and forwards them to
//! Twilio.
//!
//! ## Features
//!
//! - **Phone normalization**: loose input formats become `+<digits>`
//! - **API key gate**: static bearer token on the send and test endpoints
//! - **Rate limiting**: fixed window per client address on `/send-sms`
//! - **Error mapping**: provider error codes become stable JSON error bodies
//! - **Status callbacks**: delivery updates are accepted and logged
//! - **Configuration**: layered files plus environment variables
//! - **Observability**: structured logging and request tracing
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use smsgate::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = AppConfig::load()?;
//!     config.validate()?;
//!     let app = router(AppState::from_config(config));
//!     let listener = tokio::net::TcpListener::bind("0.0.0.0:3000").await?;
//!     axum::serve(listener, app).await?;
//!     Ok(())
//! }
//! ```
//!
//! ## Configuration
//!
//! ```rust,ignore
//! use smsgate::config::AppConfig;
//!
//! let config = AppConfig::load()?;
//! println!("Rate limit: {} requests per {}s",
//!          config.rate_limit.max_requests,
//!          config.rate_limit.window_seconds);
//! ```

pub mod auth;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod handlers;
pub mod middleware;
pub mod rate_limiter;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::*;

/// Common imports for SMS Gateway usage
pub mod prelude {
    pub use crate::auth::ApiKeyGate;
    pub use crate::config::{
        AppConfig, DispatchConfig, LoggingConfig, RateLimitConfig, RunMode, SecurityConfig,
        ServerConfig, TwilioConfig,
    };
    pub use crate::dispatcher::{Dispatcher, SendResult};
    pub use crate::error::{ApiError, ErrorCode, ErrorResponse};
    pub use crate::rate_limiter::{RateLimitResult, RateLimiter};
    pub use crate::routes::router;
    pub use crate::state::AppState;
    pub use sms_core::*;
}
