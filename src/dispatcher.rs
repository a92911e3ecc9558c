//! Builds the provider request for a validated send and maps the outcome.

use serde::Serialize;
use sms_core::{DeliveryOptions, MessageStatus, PhoneNumber, SendRequest, SmsClient, SmsError};
use sms_twilio::error_codes;
use std::sync::Arc;
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::config::DispatchConfig;

/// Successful send, as returned to the caller.
#[derive(Debug, Clone, Serialize)]
pub struct SendResult {
    pub success: bool,
    pub message: String,
    pub sid: String,
    pub status: MessageStatus,
    pub to: String,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

/// A send that has already passed validation.
#[derive(Debug, Clone)]
pub struct Outbound<'a> {
    pub to: &'a PhoneNumber,
    pub body: &'a str,
    /// Overrides the configured sender number.
    pub from: Option<&'a PhoneNumber>,
    pub emergency: bool,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    /// Provider rejected the message with a numeric error code.
    #[error("{message}")]
    Rejected { code: u32, message: String },
    /// Anything without a provider code: network, timeout, bad reply.
    #[error(transparent)]
    Failed(SmsError),
}

pub struct Dispatcher {
    client: Arc<dyn SmsClient>,
    sender: String,
    branding_suffix: String,
    emergency_attempts: u32,
    status_callback: Option<String>,
}

impl Dispatcher {
    pub fn new(client: Arc<dyn SmsClient>, sender: impl Into<String>, config: &DispatchConfig) -> Self {
        Self {
            client,
            sender: sender.into(),
            branding_suffix: config.branding_suffix.clone(),
            emergency_attempts: config.emergency_attempts,
            status_callback: None,
        }
    }

    pub fn with_status_callback(mut self, url: Option<String>) -> Self {
        self.status_callback = url;
        self
    }

    pub fn branded(&self, body: &str) -> String {
        format!("{}{}", body, self.branding_suffix)
    }

    pub async fn dispatch(&self, outbound: Outbound<'_>) -> Result<SendResult, DispatchError> {
        let text = self.branded(outbound.body);
        let from = outbound.from.map(PhoneNumber::as_str).unwrap_or(&self.sender);

        let options = DeliveryOptions {
            provide_feedback: outbound.emergency,
            attempts: outbound.emergency.then_some(self.emergency_attempts),
            status_callback: self.status_callback.as_deref(),
        };

        let request = SendRequest {
            to: outbound.to.as_str(),
            from,
            text: &text,
            options,
        };

        match self.client.send(request).await {
            Ok(response) => {
                info!(
                    to = %outbound.to.masked(),
                    sid = %response.id,
                    status = %response.status,
                    emergency = outbound.emergency,
                    "SMS dispatched"
                );
                Ok(SendResult {
                    success: true,
                    message: "SMS sent successfully".to_string(),
                    sid: response.id,
                    status: response.status,
                    to: outbound.to.to_string(),
                    timestamp: OffsetDateTime::now_utc(),
                })
            }
            Err(SmsError::Provider {
                code: Some(code),
                message,
            }) => {
                warn!(to = %outbound.to.masked(), code, provider_message = %message, "SMS rejected by provider");
                Err(DispatchError::Rejected {
                    code,
                    message: error_codes::user_message(code, &message),
                })
            }
            Err(e) => {
                error!(to = %outbound.to.masked(), error = %e, "SMS dispatch failed");
                Err(DispatchError::Failed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use sms_core::SendResponse;
    use std::sync::Mutex;

    /// Records every request and answers with a canned result.
    struct RecordingClient {
        seen: Mutex<Vec<(String, String, String, bool, Option<u32>)>>,
        reply: fn() -> Result<SendResponse, SmsError>,
    }

    impl RecordingClient {
        fn new(reply: fn() -> Result<SendResponse, SmsError>) -> Arc<Self> {
            Arc::new(Self {
                seen: Mutex::new(Vec::new()),
                reply,
            })
        }
    }

    #[async_trait]
    impl SmsClient for RecordingClient {
        async fn send(&self, req: SendRequest<'_>) -> Result<SendResponse, SmsError> {
            self.seen.lock().unwrap().push((
                req.to.to_string(),
                req.from.to_string(),
                req.text.to_string(),
                req.options.provide_feedback,
                req.options.attempts,
            ));
            (self.reply)()
        }
    }

    fn queued() -> Result<SendResponse, SmsError> {
        Ok(SendResponse {
            id: "SM123".into(),
            provider: "twilio",
            status: MessageStatus::Queued,
            to: "+15551234567".into(),
            raw: serde_json::Value::Null,
        })
    }

    fn dispatcher(client: Arc<RecordingClient>) -> Dispatcher {
        Dispatcher::new(client, "+15550009999", &DispatchConfig::default())
    }

    #[tokio::test]
    async fn sends_branded_message_from_configured_number() {
        let client = RecordingClient::new(queued);
        let to = PhoneNumber::parse("5551234567").unwrap();

        let result = dispatcher(client.clone())
            .dispatch(Outbound {
                to: &to,
                body: "hello",
                from: None,
                emergency: false,
            })
            .await
            .unwrap();

        assert!(result.success);
        assert_eq!(result.sid, "SM123");
        assert_eq!(result.status, MessageStatus::Queued);
        assert_eq!(result.to, "+15551234567");

        let seen = client.seen.lock().unwrap();
        let (to, from, text, feedback, attempts) = &seen[0];
        assert_eq!(to, "+15551234567");
        assert_eq!(from, "+15550009999");
        assert_eq!(text, "hello\n\n- Sent via SMS Gateway");
        assert!(!feedback);
        assert_eq!(*attempts, None);
    }

    #[tokio::test]
    async fn emergency_requests_feedback_and_attempts() {
        let client = RecordingClient::new(queued);
        let to = PhoneNumber::parse("5551234567").unwrap();
        let from = PhoneNumber::parse("+15557770000").unwrap();

        dispatcher(client.clone())
            .dispatch(Outbound {
                to: &to,
                body: "help",
                from: Some(&from),
                emergency: true,
            })
            .await
            .unwrap();

        let seen = client.seen.lock().unwrap();
        assert_eq!(seen[0].1, "+15557770000");
        assert!(seen[0].3);
        assert_eq!(seen[0].4, Some(3));
    }

    #[tokio::test]
    async fn known_provider_code_maps_to_table_message() {
        let client = RecordingClient::new(|| {
            Err(SmsError::Provider {
                code: Some(21211),
                message: "The 'To' number is not a valid phone number.".into(),
            })
        });
        let to = PhoneNumber::parse("5551234567").unwrap();

        let err = dispatcher(client)
            .dispatch(Outbound {
                to: &to,
                body: "hello",
                from: None,
                emergency: false,
            })
            .await
            .unwrap_err();

        match err {
            DispatchError::Rejected { code, message } => {
                assert_eq!(code, 21211);
                assert_eq!(message, "Invalid phone number");
            }
            other => panic!("expected rejection, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn unknown_provider_code_passes_message_through() {
        let client = RecordingClient::new(|| {
            Err(SmsError::Provider {
                code: Some(30007),
                message: "Message filtered by carrier".into(),
            })
        });
        let to = PhoneNumber::parse("5551234567").unwrap();

        let err = dispatcher(client)
            .dispatch(Outbound {
                to: &to,
                body: "hello",
                from: None,
                emergency: false,
            })
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "Message filtered by carrier");
    }

    #[tokio::test]
    async fn failures_without_code_are_internal() {
        let client = RecordingClient::new(|| Err(SmsError::Http("operation timed out".into())));
        let to = PhoneNumber::parse("5551234567").unwrap();

        let err = dispatcher(client)
            .dispatch(Outbound {
                to: &to,
                body: "hello",
                from: None,
                emergency: false,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, DispatchError::Failed(SmsError::Http(_))));
    }
}
