//! # SMS Core
//!
//! Core traits and types shared by the smsgate gateway and its providers.
//!
//! This crate provides the fundamental building blocks for SMS operations:
//! - [`SmsClient`] trait for sending SMS messages
//! - [`StatusWebhook`] trait for processing delivery-status callbacks
//! - [`PhoneNumber`] and the [`phone`] helpers for E.164-like normalization
//! - Common types for requests, responses, and errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use sms_core::{DeliveryOptions, PhoneNumber, SendRequest, SmsClient};
//!
//! let to = PhoneNumber::parse("(555) 123-4567")?;
//! let response = client.send(SendRequest {
//!     to: to.as_str(),
//!     from: "+15550009999",
//!     text: "Hello world!",
//!     options: DeliveryOptions::default(),
//! }).await?;
//! ```

pub mod phone;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

pub use phone::PhoneNumber;

/// Errors that can occur during SMS operations
#[derive(Debug, thiserror::Error)]
pub enum SmsError {
    /// HTTP communication error (connect failure, timeout, unreadable body)
    #[error("http error: {0}")]
    Http(String),
    /// Authentication/authorization error
    #[error("authentication error: {0}")]
    Auth(String),
    /// Invalid request parameters
    #[error("invalid request: {0}")]
    Invalid(String),
    /// SMS provider rejected the request
    #[error("provider error: {message}")]
    Provider {
        /// Numeric provider error code, when the provider supplied one.
        code: Option<u32>,
        message: String,
    },
    /// Unexpected error occurred
    #[error("unexpected: {0}")]
    Unexpected(String),
}

impl SmsError {
    /// Numeric provider error code, if this error carries one.
    pub fn provider_code(&self) -> Option<u32> {
        match self {
            SmsError::Provider { code, .. } => *code,
            _ => None,
        }
    }
}

/// Delivery state reported by a provider for an outbound message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageStatus {
    Accepted,
    Scheduled,
    Canceled,
    Queued,
    Sending,
    Sent,
    Failed,
    Delivered,
    Undelivered,
    Receiving,
    Received,
    Read,
    PartiallyDelivered,
    #[serde(other)]
    Unknown,
}

impl MessageStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            MessageStatus::Accepted => "accepted",
            MessageStatus::Scheduled => "scheduled",
            MessageStatus::Canceled => "canceled",
            MessageStatus::Queued => "queued",
            MessageStatus::Sending => "sending",
            MessageStatus::Sent => "sent",
            MessageStatus::Failed => "failed",
            MessageStatus::Delivered => "delivered",
            MessageStatus::Undelivered => "undelivered",
            MessageStatus::Receiving => "receiving",
            MessageStatus::Received => "received",
            MessageStatus::Read => "read",
            MessageStatus::PartiallyDelivered => "partially_delivered",
            MessageStatus::Unknown => "unknown",
        }
    }

    /// Whether the provider will not report any further transitions.
    pub fn is_final(self) -> bool {
        matches!(
            self,
            MessageStatus::Canceled
                | MessageStatus::Failed
                | MessageStatus::Delivered
                | MessageStatus::Undelivered
                | MessageStatus::Received
                | MessageStatus::Read
        )
    }
}

impl From<&str> for MessageStatus {
    fn from(s: &str) -> Self {
        match s.to_ascii_lowercase().as_str() {
            "accepted" => MessageStatus::Accepted,
            "scheduled" => MessageStatus::Scheduled,
            "canceled" => MessageStatus::Canceled,
            "queued" => MessageStatus::Queued,
            "sending" => MessageStatus::Sending,
            "sent" => MessageStatus::Sent,
            "failed" => MessageStatus::Failed,
            "delivered" => MessageStatus::Delivered,
            "undelivered" => MessageStatus::Undelivered,
            "receiving" => MessageStatus::Receiving,
            "received" => MessageStatus::Received,
            "read" => MessageStatus::Read,
            "partially_delivered" => MessageStatus::PartiallyDelivered,
            _ => MessageStatus::Unknown,
        }
    }
}

impl fmt::Display for MessageStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Provider-side delivery hints. Best effort; providers may ignore them.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryOptions<'a> {
    /// Ask the provider to collect delivery feedback for this message.
    pub provide_feedback: bool,
    /// Number of delivery attempts to request from the provider.
    pub attempts: Option<u32>,
    /// URL the provider should post delivery-status callbacks to.
    pub status_callback: Option<&'a str>,
}

#[derive(Debug, Clone)]
pub struct SendRequest<'a> {
    pub to: &'a str,
    pub from: &'a str,
    pub text: &'a str,
    pub options: DeliveryOptions<'a>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SendResponse {
    /// Provider-assigned message identifier.
    pub id: String,
    /// Name of the backend/provider that produced the response, e.g. "twilio".
    pub provider: &'static str,
    pub status: MessageStatus,
    /// Recipient as echoed back by the provider.
    pub to: String,
    /// Raw provider payload for debugging / audit.
    pub raw: serde_json::Value,
}

/// Normalized delivery-status callback.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DeliveryReport {
    pub id: Option<String>,
    pub status: MessageStatus,
    pub to: Option<String>,
    pub error_code: Option<String>,
    pub provider: &'static str,
    pub raw: serde_json::Value,
}

#[async_trait]
pub trait SmsClient: Send + Sync {
    /// Send a single text SMS.
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, SmsError>;
}

/// Lightweight header representation to avoid tying the core to any HTTP framework.
pub type Headers = Vec<(String, String)>;

/// Case-insensitive lookup in [`Headers`].
pub fn header_value<'h>(headers: &'h Headers, name: &str) -> Option<&'h str> {
    headers
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(name))
        .map(|(_, v)| v.as_str())
}

/// Provider-agnostic delivery-status webhook interface.
pub trait StatusWebhook: Send + Sync {
    /// Stable provider key, e.g. "twilio".
    fn provider(&self) -> &'static str;
    /// Parse the incoming HTTP payload (headers + raw body) into a normalized `DeliveryReport`.
    fn parse_status(&self, headers: &Headers, body: &[u8]) -> Result<DeliveryReport, SmsError>;

    /// Optional signature verification (no-op by default).
    fn verify(&self, _headers: &Headers, _body: &[u8]) -> Result<(), SmsError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn message_status_parses_provider_strings() {
        assert_eq!(MessageStatus::from("queued"), MessageStatus::Queued);
        assert_eq!(MessageStatus::from("DELIVERED"), MessageStatus::Delivered);
        assert_eq!(
            MessageStatus::from("partially_delivered"),
            MessageStatus::PartiallyDelivered
        );
        assert_eq!(MessageStatus::from("teleported"), MessageStatus::Unknown);
    }

    #[test]
    fn message_status_serde_falls_back_to_unknown() {
        let status: MessageStatus = serde_json::from_str("\"sent\"").unwrap();
        assert_eq!(status, MessageStatus::Sent);
        let status: MessageStatus = serde_json::from_str("\"something-new\"").unwrap();
        assert_eq!(status, MessageStatus::Unknown);
        assert_eq!(serde_json::to_string(&MessageStatus::Queued).unwrap(), "\"queued\"");
    }

    #[test]
    fn provider_error_exposes_code() {
        let err = SmsError::Provider {
            code: Some(21211),
            message: "The 'To' number is not valid".into(),
        };
        assert_eq!(err.provider_code(), Some(21211));
        assert!(err.to_string().contains("not valid"));
        assert_eq!(SmsError::Http("timeout".into()).provider_code(), None);
    }

    #[test]
    fn header_lookup_ignores_case() {
        let headers: Headers = vec![("X-Twilio-Signature".into(), "abc".into())];
        assert_eq!(header_value(&headers, "x-twilio-signature"), Some("abc"));
        assert_eq!(header_value(&headers, "authorization"), None);
    }
}
