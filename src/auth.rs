//! Static bearer-token gate.

use subtle::ConstantTimeEq;

use crate::config::SecurityConfig;

/// Compares `Authorization: Bearer <token>` against the configured secret.
///
/// With no secret configured the gate is open; [`AppConfig::validate`]
/// only allows that in development mode.
///
/// [`AppConfig::validate`]: crate::config::AppConfig::validate
#[derive(Clone)]
pub struct ApiKeyGate {
    secret: Option<String>,
}

impl std::fmt::Debug for ApiKeyGate {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiKeyGate")
            .field("enabled", &self.is_enabled())
            .finish()
    }
}

impl ApiKeyGate {
    pub fn new(secret: Option<String>) -> Self {
        Self {
            secret: secret.filter(|s| !s.is_empty()),
        }
    }

    pub fn from_config(config: &SecurityConfig) -> Self {
        Self::new(config.api_secret_key.clone())
    }

    pub fn is_enabled(&self) -> bool {
        self.secret.is_some()
    }

    /// `authorization` is the raw header value, if any.
    pub fn authorize(&self, authorization: Option<&str>) -> bool {
        let Some(secret) = &self.secret else {
            return true;
        };
        authorization
            .and_then(|value| value.strip_prefix("Bearer "))
            .is_some_and(|token| bool::from(token.as_bytes().ct_eq(secret.as_bytes())))
    }
}
