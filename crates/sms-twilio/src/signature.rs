//! `X-Twilio-Signature` computation and verification.
//!
//! Twilio signs each webhook with base64(HMAC-SHA1(auth_token, url + params)),
//! where params are the POST form fields sorted by name and concatenated as
//! `name` + `value` with no separators.

use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use hmac::{Hmac, Mac};
use sha1::Sha1;
use sms_core::SmsError;

type HmacSha1 = Hmac<Sha1>;

pub const SIGNATURE_HEADER: &str = "x-twilio-signature";

fn mac_for(auth_token: &str, url: &str, params: &[(String, String)]) -> Result<HmacSha1, SmsError> {
    let mut sorted: Vec<&(String, String)> = params.iter().collect();
    sorted.sort();

    let mut mac = HmacSha1::new_from_slice(auth_token.as_bytes())
        .map_err(|e| SmsError::Unexpected(format!("hmac key: {}", e)))?;
    mac.update(url.as_bytes());
    for (name, value) in sorted {
        mac.update(name.as_bytes());
        mac.update(value.as_bytes());
    }
    Ok(mac)
}

/// Computes the signature Twilio would send for `url` and form `params`.
pub fn compute(auth_token: &str, url: &str, params: &[(String, String)]) -> Result<String, SmsError> {
    let mac = mac_for(auth_token, url, params)?;
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

/// Checks a received signature in constant time.
pub fn verify(
    auth_token: &str,
    url: &str,
    params: &[(String, String)],
    signature: &str,
) -> Result<(), SmsError> {
    let expected = STANDARD
        .decode(signature.trim())
        .map_err(|_| SmsError::Auth("signature is not valid base64".into()))?;
    mac_for(auth_token, url, params)?
        .verify_slice(&expected)
        .map_err(|_| SmsError::Auth("signature mismatch".into()))
}
