use axum::Json;
use axum::extract::State;
use axum::extract::rejection::BytesRejection;
use axum::http::{HeaderMap, StatusCode, header};
use bytes::Bytes;
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use sms_core::{Headers, PhoneNumber};
use time::OffsetDateTime;
use tracing::{error, info, warn};

use crate::dispatcher::{DispatchError, Outbound, SendResult};
use crate::error::ApiError;
use crate::routes::ENDPOINTS;
use crate::state::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct SendSmsBody {
    pub to: Option<String>,
    pub message: Option<String>,
    pub from: Option<String>,
    #[serde(default)]
    pub emergency: bool,
}

#[derive(Debug, Default, Deserialize)]
pub struct TestSmsBody {
    pub to: Option<String>,
    pub message: Option<String>,
    #[serde(default)]
    pub test: bool,
}

#[derive(Debug, Serialize)]
pub struct ServiceDescriptor {
    pub name: &'static str,
    pub status: &'static str,
    pub version: &'static str,
    pub endpoints: &'static [&'static str],
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub status: &'static str,
    pub provider_configured: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub timestamp: OffsetDateTime,
}

#[derive(Debug, Serialize)]
pub struct TestSmsResponse {
    pub success: bool,
    pub message: &'static str,
    pub to: String,
}

fn is_json(headers: &HeaderMap) -> bool {
    headers
        .get(header::CONTENT_TYPE)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(';').next())
        .map(|mime| mime.trim().to_ascii_lowercase())
        .is_some_and(|mime| mime == "application/json" || mime.ends_with("+json"))
}

/// A body that is empty or not declared as JSON reads as `{}`, so it fails
/// field validation rather than parsing.
fn read_body<T: DeserializeOwned + Default>(
    headers: &HeaderMap,
    payload: Result<Bytes, BytesRejection>,
) -> Result<T, ApiError> {
    let bytes = payload.map_err(|rejection| match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => ApiError::BodyTooLarge,
        _ => ApiError::InvalidBody(rejection.body_text()),
    })?;

    if !is_json(headers) || bytes.trim_ascii().is_empty() {
        return Ok(T::default());
    }
    Json::<T>::from_bytes(&bytes)
        .map(|Json(body)| body)
        .map_err(|rejection| ApiError::InvalidBody(rejection.body_text()))
}

fn present(field: &Option<String>) -> Option<&str> {
    field.as_deref().filter(|v| !v.is_empty())
}

/// Field presence first, then phone format.
fn validate<'a>(
    to: &'a Option<String>,
    message: &'a Option<String>,
) -> Result<(PhoneNumber, &'a str), ApiError> {
    let (Some(to), Some(message)) = (present(to), present(message)) else {
        return Err(ApiError::MissingFields);
    };
    let to = PhoneNumber::parse(to).map_err(|_| ApiError::InvalidPhoneFormat)?;
    Ok((to, message))
}

pub async fn index() -> Json<ServiceDescriptor> {
    Json(ServiceDescriptor {
        name: "SMS Gateway",
        status: "running",
        version: env!("CARGO_PKG_VERSION"),
        endpoints: ENDPOINTS,
    })
}

pub async fn status(State(state): State<AppState>) -> Json<StatusResponse> {
    Json(StatusResponse {
        status: "operational",
        provider_configured: state.provider_configured(),
        timestamp: OffsetDateTime::now_utc(),
    })
}

/// Validates like `/send-sms` but never contacts the provider.
pub async fn test_sms(
    headers: HeaderMap,
    payload: Result<Bytes, BytesRejection>,
) -> Result<Json<TestSmsResponse>, ApiError> {
    let body: TestSmsBody = read_body(&headers, payload)?;
    let (to, _message) = validate(&body.to, &body.message)?;

    let message = if body.test {
        "Test mode: SMS validated but not sent"
    } else {
        "Validation passed: SMS is ready to send"
    };
    info!(to = %to.masked(), test = body.test, "Test SMS validated");

    Ok(Json(TestSmsResponse {
        success: true,
        message,
        to: to.into_string(),
    }))
}

pub async fn send_sms(
    State(state): State<AppState>,
    headers: HeaderMap,
    payload: Result<Bytes, BytesRejection>,
) -> Result<Json<SendResult>, ApiError> {
    let body: SendSmsBody = read_body(&headers, payload)?;
    let (to, message) = validate(&body.to, &body.message)?;
    let from = present(&body.from)
        .map(PhoneNumber::parse)
        .transpose()
        .map_err(|_| ApiError::InvalidPhoneFormat)?;

    let dispatcher = state
        .dispatcher
        .as_ref()
        .ok_or(ApiError::ProviderNotConfigured)?;

    let outbound = Outbound {
        to: &to,
        body: message,
        from: from.as_ref(),
        emergency: body.emergency,
    };

    match dispatcher.dispatch(outbound).await {
        Ok(result) => Ok(Json(result)),
        Err(DispatchError::Rejected { code, message }) => Err(ApiError::Provider { code, message }),
        Err(DispatchError::Failed(e)) => Err(ApiError::Internal {
            details: state
                .config
                .environment
                .is_development()
                .then(|| e.to_string()),
        }),
    }
}

fn to_generic_headers(headers: &HeaderMap) -> Headers {
    headers
        .iter()
        .map(|(k, v)| {
            (
                k.as_str().to_string(),
                v.to_str().unwrap_or_default().to_string(),
            )
        })
        .collect()
}

/// Delivery-status callback. Logged only; always acknowledged unless the
/// signature check is enabled and fails.
pub async fn sms_status(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Result<(StatusCode, &'static str), ApiError> {
    let headers = to_generic_headers(&headers);

    if state.config.twilio.verify_signatures {
        let hook = state
            .status_webhook
            .as_ref()
            .ok_or(ApiError::InvalidSignature)?;
        if let Err(e) = hook.verify(&headers, &body) {
            warn!(error = %e, "Rejected status callback");
            return Err(ApiError::InvalidSignature);
        }
    }

    let parsed = match &state.status_webhook {
        Some(hook) => hook.parse_status(&headers, &body),
        None => sms_twilio::parse_status_callback(&body),
    };

    match parsed {
        Ok(report) => {
            let to = report
                .to
                .as_deref()
                .and_then(|to| PhoneNumber::parse(to).ok())
                .map(|to| to.masked());
            info!(
                sid = report.id.as_deref().unwrap_or("-"),
                status = %report.status,
                to = to.as_deref().unwrap_or("-"),
                error_code = report.error_code.as_deref().unwrap_or("-"),
                "SMS status update"
            )
        }
        Err(e) => error!(error = %e, "Unreadable status callback"),
    }

    Ok((StatusCode::OK, "OK"))
}

pub async fn not_found() -> ApiError {
    ApiError::NotFound {
        endpoints: ENDPOINTS.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_fields_win_over_bad_format() {
        let to = Some("abc".to_string());
        assert!(matches!(validate(&to, &None), Err(ApiError::MissingFields)));
        assert!(matches!(
            validate(&None, &Some("hi".into())),
            Err(ApiError::MissingFields)
        ));
        assert!(matches!(
            validate(&Some(String::new()), &Some("hi".into())),
            Err(ApiError::MissingFields)
        ));
    }

    #[test]
    fn malformed_phone_is_rejected() {
        assert!(matches!(
            validate(&Some("abc".into()), &Some("hi".into())),
            Err(ApiError::InvalidPhoneFormat)
        ));
    }

    fn json_headers() -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(header::CONTENT_TYPE, "application/json".parse().unwrap());
        headers
    }

    #[test]
    fn empty_json_body_reads_as_empty_object() {
        for raw in ["", "  \n"] {
            let body: SendSmsBody =
                read_body(&json_headers(), Ok(Bytes::from_static(raw.as_bytes()))).unwrap();
            assert!(body.to.is_none());
            assert!(body.message.is_none());
        }
    }

    #[test]
    fn non_json_content_type_reads_as_empty_object() {
        let body: TestSmsBody =
            read_body(&HeaderMap::new(), Ok(Bytes::from_static(b"to=5551234567"))).unwrap();
        assert!(body.to.is_none());
        assert!(!body.test);
    }

    #[test]
    fn json_body_is_decoded() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::CONTENT_TYPE,
            "application/json; charset=utf-8".parse().unwrap(),
        );
        let raw = br#"{"to":"5551234567","message":"hi","emergency":true}"#;
        let body: SendSmsBody = read_body(&headers, Ok(Bytes::from_static(raw))).unwrap();
        assert_eq!(body.to.as_deref(), Some("5551234567"));
        assert!(body.emergency);
    }

    #[test]
    fn malformed_json_is_invalid_body() {
        let result: Result<SendSmsBody, _> =
            read_body(&json_headers(), Ok(Bytes::from_static(b"{not json")));
        assert!(matches!(result, Err(ApiError::InvalidBody(_))));
    }

    #[test]
    fn valid_input_is_normalized() {
        let to = Some("(555) 123-4567".to_string());
        let message = Some("hi".to_string());
        let (number, text) = validate(&to, &message).unwrap();
        assert_eq!(number.as_str(), "+15551234567");
        assert_eq!(text, "hi");
    }
}
