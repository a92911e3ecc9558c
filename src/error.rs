use axum::Json;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use std::time::Duration;

/// Machine-readable error codes returned in every error body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    MissingFields,
    InvalidPhoneFormat,
    InvalidRequestBody,
    InvalidApiKey,
    InvalidSignature,
    RateLimitExceeded,
    TwilioNotConfigured,
    TwilioError,
    InternalError,
    NotFound,
}

/// JSON error body.
#[derive(Debug, Clone, Serialize)]
pub struct ErrorResponse {
    pub error: String,
    pub code: ErrorCode,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub provider_code: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub available_endpoints: Option<Vec<&'static str>>,
}

impl ErrorResponse {
    pub fn new(error: impl Into<String>, code: ErrorCode) -> Self {
        Self {
            error: error.into(),
            code,
            provider_code: None,
            details: None,
            available_endpoints: None,
        }
    }
}

/// Every failure a handler or middleware can produce.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("missing required fields: to, message")]
    MissingFields,
    #[error("invalid phone number format")]
    InvalidPhoneFormat,
    #[error("invalid request body: {0}")]
    InvalidBody(String),
    #[error("request body too large")]
    BodyTooLarge,
    #[error("invalid or missing API key")]
    InvalidApiKey,
    #[error("invalid webhook signature")]
    InvalidSignature,
    #[error("rate limit exceeded")]
    RateLimited { retry_after: Duration },
    #[error("SMS provider not configured")]
    ProviderNotConfigured,
    #[error("provider error {code}: {message}")]
    Provider { code: u32, message: String },
    /// `details` is only filled in development mode.
    #[error("internal error")]
    Internal { details: Option<String> },
    #[error("endpoint not found")]
    NotFound { endpoints: Vec<&'static str> },
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::MissingFields
            | ApiError::InvalidPhoneFormat
            | ApiError::InvalidBody(_)
            | ApiError::Provider { .. } => StatusCode::BAD_REQUEST,
            ApiError::BodyTooLarge => StatusCode::PAYLOAD_TOO_LARGE,
            ApiError::InvalidApiKey => StatusCode::UNAUTHORIZED,
            ApiError::InvalidSignature => StatusCode::FORBIDDEN,
            ApiError::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            ApiError::ProviderNotConfigured | ApiError::Internal { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
            ApiError::NotFound { .. } => StatusCode::NOT_FOUND,
        }
    }

    pub fn body(&self) -> ErrorResponse {
        match self {
            ApiError::MissingFields => ErrorResponse::new(
                "Missing required fields: to and message are required",
                ErrorCode::MissingFields,
            ),
            ApiError::InvalidPhoneFormat => ErrorResponse::new(
                "Invalid phone number format. Use E.164 format (e.g., +1234567890)",
                ErrorCode::InvalidPhoneFormat,
            ),
            ApiError::InvalidBody(reason) => ErrorResponse {
                details: Some(reason.clone()),
                ..ErrorResponse::new("Request body is not valid JSON", ErrorCode::InvalidRequestBody)
            },
            ApiError::BodyTooLarge => {
                ErrorResponse::new("Request body too large", ErrorCode::InvalidRequestBody)
            }
            ApiError::InvalidApiKey => {
                ErrorResponse::new("Invalid or missing API key", ErrorCode::InvalidApiKey)
            }
            ApiError::InvalidSignature => {
                ErrorResponse::new("Invalid webhook signature", ErrorCode::InvalidSignature)
            }
            ApiError::RateLimited { .. } => ErrorResponse::new(
                "Too many SMS requests from this IP, please try again later",
                ErrorCode::RateLimitExceeded,
            ),
            ApiError::ProviderNotConfigured => ErrorResponse::new(
                "SMS service not configured. Please check Twilio credentials.",
                ErrorCode::TwilioNotConfigured,
            ),
            ApiError::Provider { code, message } => ErrorResponse {
                provider_code: Some(*code),
                ..ErrorResponse::new(message.clone(), ErrorCode::TwilioError)
            },
            ApiError::Internal { details } => ErrorResponse {
                details: details.clone(),
                ..ErrorResponse::new("Internal server error", ErrorCode::InternalError)
            },
            ApiError::NotFound { endpoints } => ErrorResponse {
                available_endpoints: Some(endpoints.clone()),
                ..ErrorResponse::new("Endpoint not found", ErrorCode::NotFound)
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (self.status(), Json(self.body())).into_response();
        if let ApiError::RateLimited { retry_after } = self {
            let seconds = retry_after.as_secs().max(1);
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(seconds));
        }
        response
    }
}
