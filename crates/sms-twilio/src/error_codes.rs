//! Human-readable messages for the Twilio error codes callers are most likely
//! to hit when sending SMS.
//!
//! See <https://www.twilio.com/docs/api/errors> for the full list.

/// 'To' number is not a valid phone number.
pub const INVALID_TO_NUMBER: u32 = 21211;
/// 'To' number is not currently reachable via SMS.
pub const UNREACHABLE_TO_NUMBER: u32 = 21612;
/// 'To' number is not a valid mobile number.
pub const NOT_SMS_CAPABLE: u32 = 21614;
/// Account SID / auth token pair was rejected.
pub const AUTHENTICATION_FAILED: u32 = 20003;
/// Too many concurrent requests.
pub const TOO_MANY_REQUESTS: u32 = 20429;

/// Used when neither the table nor the provider has anything useful to say.
pub const GENERIC_FAILURE: &str = "Failed to send SMS";

const MESSAGES: &[(u32, &str)] = &[
    (INVALID_TO_NUMBER, "Invalid phone number"),
    (UNREACHABLE_TO_NUMBER, "Phone number is not reachable"),
    (NOT_SMS_CAPABLE, "Phone number is not SMS-capable"),
    (AUTHENTICATION_FAILED, "Authentication failed"),
    (TOO_MANY_REQUESTS, "Too many requests to SMS provider"),
];

/// Table lookup only.
pub fn describe(code: u32) -> Option<&'static str> {
    MESSAGES
        .iter()
        .find(|(known, _)| *known == code)
        .map(|(_, message)| *message)
}

/// Message to show a caller for a provider failure: the table entry when the
/// code is known, else the provider's own text, else [`GENERIC_FAILURE`].
pub fn user_message(code: u32, provider_message: &str) -> String {
    match describe(code) {
        Some(message) => message.to_string(),
        None if !provider_message.trim().is_empty() => provider_message.to_string(),
        None => GENERIC_FAILURE.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_use_table_messages() {
        assert_eq!(describe(21211), Some("Invalid phone number"));
        assert_eq!(describe(21614), Some("Phone number is not SMS-capable"));
        assert_eq!(
            user_message(21211, "The 'To' number 123 is not a valid phone number."),
            "Invalid phone number"
        );
    }

    #[test]
    fn unknown_codes_pass_provider_text_through() {
        assert_eq!(describe(30007), None);
        assert_eq!(user_message(30007, "Message filtered"), "Message filtered");
        assert_eq!(user_message(30007, "  "), GENERIC_FAILURE);
    }
}
