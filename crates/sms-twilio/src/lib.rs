//! # Twilio SMS Provider
//!
//! Twilio Programmable Messaging implementation for smsgate.
//!
//! ## Features
//!
//! - Send SMS through the Messages REST resource (form-encoded, Basic auth)
//! - Per-request timeout, no internal retry
//! - Delivery hints (`ProvideFeedback`, `Attempt`, `StatusCallback`)
//! - Status-callback parsing and `X-Twilio-Signature` verification
//!
//! ## Example
//!
//! ```rust,ignore
//! use sms_core::{DeliveryOptions, SendRequest, SmsClient};
//! use sms_twilio::TwilioClient;
//!
//! let client = TwilioClient::new("ACxxxxxxxx", "auth_token");
//! let response = client.send(SendRequest {
//!     to: "+15551234567",
//!     from: "+15550009999",
//!     text: "Hello from Twilio!",
//!     options: DeliveryOptions::default(),
//! }).await?;
//! ```

pub mod error_codes;
pub mod signature;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sms_core::{
    DeliveryReport, Headers, MessageStatus, SendRequest, SendResponse, SmsClient, SmsError,
    StatusWebhook, header_value,
};
use std::time::Duration;
use tracing::{debug, info, warn};
use url::Url;

const PROVIDER: &str = "twilio";

pub const DEFAULT_BASE_URL: &str = "https://api.twilio.com";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Twilio REST client.
#[derive(Clone)]
pub struct TwilioClient {
    /// Twilio Account SID.
    pub account_sid: String,
    auth_token: String,
    /// API base URL; override for testing/mocking.
    pub base_url: String,
    timeout: Duration,
    /// Public URL Twilio posts status callbacks to; needed for signature checks.
    status_callback: Option<String>,
    http: reqwest::Client,
}

impl std::fmt::Debug for TwilioClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TwilioClient")
            .field("account_sid", &self.account_sid)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .field("status_callback", &self.status_callback)
            .finish_non_exhaustive()
    }
}

impl TwilioClient {
    pub fn new<S: Into<String>>(account_sid: S, auth_token: S) -> Self {
        Self::with_base_url(account_sid, auth_token, DEFAULT_BASE_URL.to_string())
    }

    pub fn with_base_url<S: Into<String>>(account_sid: S, auth_token: S, base_url: String) -> Self {
        Self {
            account_sid: account_sid.into(),
            auth_token: auth_token.into(),
            base_url,
            timeout: DEFAULT_TIMEOUT,
            status_callback: None,
            http: reqwest::Client::new(),
        }
    }

    /// Upper bound for a single send call, connect through response body.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_status_callback(mut self, url: impl Into<String>) -> Self {
        self.status_callback = Some(url.into());
        self
    }

    pub fn status_callback(&self) -> Option<&str> {
        self.status_callback.as_deref()
    }

    fn messages_url(&self) -> Result<Url, SmsError> {
        let mut base = Url::parse(&self.base_url)
            .map_err(|e| SmsError::Invalid(format!("base url {}: {}", self.base_url, e)))?;
        if !base.path().ends_with('/') {
            let path = format!("{}/", base.path());
            base.set_path(&path);
        }
        base.join(&format!("2010-04-01/Accounts/{}/Messages.json", self.account_sid))
            .map_err(|e| SmsError::Invalid(format!("messages url: {}", e)))
    }
}

/// Subset of the Message resource returned on create.
#[derive(Debug, Deserialize, Serialize)]
struct TwilioMessage {
    sid: String,
    status: MessageStatus,
    to: String,
}

/// Error body Twilio returns with 4xx/5xx responses.
#[derive(Debug, Deserialize)]
struct TwilioApiError {
    code: Option<u32>,
    message: Option<String>,
    more_info: Option<String>,
}

fn error_from_reply(status: reqwest::StatusCode, raw_json: &serde_json::Value, raw_text: &str) -> SmsError {
    match serde_json::from_value::<TwilioApiError>(raw_json.clone()) {
        Ok(TwilioApiError {
            code: Some(code),
            message,
            more_info,
        }) => {
            warn!(code, status = %status, more_info = ?more_info, "Twilio rejected message");
            SmsError::Provider {
                code: Some(code),
                message: message.unwrap_or_default(),
            }
        }
        _ => SmsError::Provider {
            code: None,
            message: format!("HTTP {}: {}", status, raw_text),
        },
    }
}

#[async_trait]
impl SmsClient for TwilioClient {
    async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, SmsError> {
        let url = self.messages_url()?;

        let mut form: Vec<(&str, String)> = vec![
            ("To", req.to.to_string()),
            ("From", req.from.to_string()),
            ("Body", req.text.to_string()),
        ];
        if req.options.provide_feedback {
            form.push(("ProvideFeedback", "true".to_string()));
        }
        if let Some(attempts) = req.options.attempts {
            form.push(("Attempt", attempts.to_string()));
        }
        if let Some(callback) = req.options.status_callback {
            form.push(("StatusCallback", callback.to_string()));
        }

        debug!(
            params = ?form.iter().map(|(k, _)| *k).collect::<Vec<_>>(),
            "Sending SMS via Twilio"
        );

        let res = self
            .http
            .post(url)
            .basic_auth(&self.account_sid, Some(&self.auth_token))
            .timeout(self.timeout)
            .form(&form)
            .send()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;

        let status = res.status();
        let raw_text = res
            .text()
            .await
            .map_err(|e| SmsError::Http(e.to_string()))?;
        let raw_json: serde_json::Value = serde_json::from_str(&raw_text)
            .unwrap_or_else(|_| serde_json::json!({ "raw": raw_text }));

        if !status.is_success() {
            return Err(error_from_reply(status, &raw_json, &raw_text));
        }

        let message: TwilioMessage = serde_json::from_value(raw_json.clone())
            .map_err(|e| SmsError::Unexpected(format!("unexpected Twilio reply: {}", e)))?;

        info!(sid = %message.sid, status = %message.status, "SMS accepted by Twilio");

        Ok(SendResponse {
            id: message.sid,
            provider: PROVIDER,
            status: message.status,
            to: message.to,
            raw: raw_json,
        })
    }
}

/// Form fields Twilio posts to a message's `StatusCallback` URL.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct TwilioStatusCallback {
    #[serde(rename = "MessageSid")]
    pub message_sid: Option<String>,
    #[serde(rename = "MessageStatus")]
    pub message_status: Option<String>,
    #[serde(rename = "To")]
    pub to: Option<String>,
    #[serde(rename = "From")]
    pub from: Option<String>,
    #[serde(rename = "ErrorCode")]
    pub error_code: Option<String>,
    #[serde(rename = "AccountSid")]
    pub account_sid: Option<String>,
}

fn decode_form(body: &[u8]) -> Result<Vec<(String, String)>, SmsError> {
    serde_urlencoded::from_bytes(body).map_err(|e| SmsError::Invalid(format!("form decode: {}", e)))
}

/// Parses a form-encoded status callback body.
pub fn parse_status_callback(body: &[u8]) -> Result<DeliveryReport, SmsError> {
    let pairs = decode_form(body)?;
    let callback: TwilioStatusCallback = serde_urlencoded::from_bytes(body)
        .map_err(|e| SmsError::Invalid(format!("form decode: {}", e)))?;

    let raw = serde_json::Value::Object(
        pairs
            .into_iter()
            .map(|(k, v)| (k, serde_json::Value::String(v)))
            .collect(),
    );

    Ok(DeliveryReport {
        id: callback.message_sid,
        status: callback
            .message_status
            .as_deref()
            .map(MessageStatus::from)
            .unwrap_or(MessageStatus::Unknown),
        to: callback.to,
        error_code: callback.error_code,
        provider: PROVIDER,
        raw,
    })
}

impl StatusWebhook for TwilioClient {
    fn provider(&self) -> &'static str {
        PROVIDER
    }

    fn parse_status(&self, _headers: &Headers, body: &[u8]) -> Result<DeliveryReport, SmsError> {
        parse_status_callback(body)
    }

    fn verify(&self, headers: &Headers, body: &[u8]) -> Result<(), SmsError> {
        let url = self
            .status_callback
            .as_deref()
            .ok_or_else(|| SmsError::Auth("status callback url not configured".into()))?;
        let provided = header_value(headers, signature::SIGNATURE_HEADER)
            .ok_or_else(|| SmsError::Auth("missing X-Twilio-Signature header".into()))?;
        let params = decode_form(body)?;
        signature::verify(&self.auth_token, url, &params, provided)
    }
}
