//! Phone-number validation and E.164-like normalization.
//!
//! This is a formatting heuristic tuned for North American numbers, not a
//! numbering-plan implementation: a bare 10-digit number is assumed to be
//! NANP and gets a `+1` prefix, everything else just gets a `+`.

use serde::Serialize;
use std::fmt;

use crate::SmsError;

/// Minimum number of digit/punctuation characters after the optional `+`.
pub const MIN_PHONE_CHARS: usize = 10;

fn is_phone_char(c: char) -> bool {
    c.is_ascii_digit() || matches!(c, ' ' | '-' | '(' | ')')
}

/// Returns true if `input` looks like a phone number: an optional leading
/// `+` followed by at least [`MIN_PHONE_CHARS`] digits, spaces, hyphens or
/// parentheses, at least one of them a digit.
pub fn is_valid(input: &str) -> bool {
    let rest = input.strip_prefix('+').unwrap_or(input);
    rest.chars().count() >= MIN_PHONE_CHARS
        && rest.chars().all(is_phone_char)
        && rest.chars().any(|c| c.is_ascii_digit())
}

/// Reformats a number that passed [`is_valid`] into `+<digits>` form.
pub fn normalize(input: &str) -> String {
    let digits: String = input.chars().filter(|c| c.is_ascii_digit()).collect();

    if input.starts_with('+') {
        return format!("+{digits}");
    }

    match digits.len() {
        11 if digits.starts_with('1') => format!("+{digits}"),
        10 => format!("+1{digits}"),
        _ => format!("+{digits}"),
    }
}

/// A validated, normalized phone number.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct PhoneNumber(String);

impl PhoneNumber {
    pub fn parse(input: &str) -> Result<Self, SmsError> {
        if !is_valid(input) {
            return Err(SmsError::Invalid(format!(
                "not a phone number: {:?}",
                input
            )));
        }
        Ok(Self(normalize(input)))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }

    /// Form safe for log output: keeps the country prefix and the last four digits.
    pub fn masked(&self) -> String {
        let digits = &self.0[1..];
        if digits.len() <= 6 {
            return format!("+{}", "*".repeat(digits.len()));
        }
        let keep_head = 2.min(digits.len() - 4);
        let head = &digits[..keep_head];
        let tail = &digits[digits.len() - 4..];
        let hidden = digits.len() - keep_head - 4;
        format!("+{head}{}{tail}", "*".repeat(hidden))
    }
}

impl fmt::Display for PhoneNumber {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl AsRef<str> for PhoneNumber {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_common_formats() {
        for input in [
            "5551234567",
            "15551234567",
            "+15551234567",
            "(555) 123-4567",
            "555-123-4567",
            "+44 20 7946 0958",
        ] {
            assert!(is_valid(input), "{input} should be valid");
        }
    }

    #[test]
    fn rejects_malformed_input() {
        for input in ["abc", "", "12345", "+1555abc4567", "555.123.4567", " +15551234567", "++15551234567"] {
            assert!(!is_valid(input), "{input} should be invalid");
        }
    }

    #[test]
    fn punctuation_alone_is_not_a_number() {
        for input in ["----------", "+( ) ( ) ( ) -", "          "] {
            assert!(!is_valid(input), "{input:?} should be invalid");
            assert!(PhoneNumber::parse(input).is_err());
        }
    }

    #[test]
    fn normalizes_north_american_numbers() {
        assert_eq!(normalize("5551234567"), "+15551234567");
        assert_eq!(normalize("15551234567"), "+15551234567");
        assert_eq!(normalize("+15551234567"), "+15551234567");
        assert_eq!(normalize("(555) 123-4567"), "+15551234567");
        assert_eq!(normalize("1 (555) 123-4567"), "+15551234567");
    }

    #[test]
    fn normalizes_other_numbers_with_plain_prefix() {
        assert_eq!(normalize("+44 20 7946 0958"), "+442079460958");
        assert_eq!(normalize("442079460958"), "+442079460958");
        // 11 digits not starting with 1 is not treated as NANP
        assert_eq!(normalize("25551234567"), "+25551234567");
    }

    #[test]
    fn normalization_is_idempotent() {
        for input in ["5551234567", "15551234567", "(555) 123-4567", "+44 20 7946 0958", "442079460958"] {
            let once = normalize(input);
            assert!(is_valid(&once));
            assert_eq!(normalize(&once), once);
        }
    }

    #[test]
    fn parse_yields_normalized_number() {
        let number = PhoneNumber::parse("555-123-4567").unwrap();
        assert_eq!(number.as_str(), "+15551234567");
        assert_eq!(number.to_string(), "+15551234567");
        assert!(matches!(PhoneNumber::parse("abc"), Err(SmsError::Invalid(_))));
    }

    #[test]
    fn masked_hides_middle_digits() {
        let number = PhoneNumber::parse("+15551234567").unwrap();
        assert_eq!(number.masked(), "+15*****4567");
    }
}
