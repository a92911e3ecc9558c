use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::env;
use std::fmt;
use std::time::Duration;

/// Deployment mode; controls error-detail exposure and the API key requirement.
///
/// Any value other than `development` (case-insensitive) is production.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase", from = "String")]
pub enum RunMode {
    Development,
    Production,
}

impl From<String> for RunMode {
    fn from(value: String) -> Self {
        if value.trim().eq_ignore_ascii_case("development") {
            RunMode::Development
        } else {
            RunMode::Production
        }
    }
}

impl RunMode {
    pub fn is_development(self) -> bool {
        self == RunMode::Development
    }
}

/// Application configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Deployment mode (default: development)
    pub environment: RunMode,
    /// Server configuration
    pub server: ServerConfig,
    /// Twilio provider configuration
    pub twilio: TwilioConfig,
    /// Security configuration
    pub security: SecurityConfig,
    /// Rate limiting configuration
    pub rate_limit: RateLimitConfig,
    /// Outbound message shaping
    pub dispatch: DispatchConfig,
    /// Logging configuration
    pub logging: LoggingConfig,
}

/// Server configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct ServerConfig {
    /// Server host (default: 0.0.0.0)
    pub host: String,
    /// Server port (default: 3000)
    pub port: u16,
    /// CORS origin; unset or "*" allows any origin
    pub allowed_origin: Option<String>,
    /// Take the client address from X-Forwarded-For and friends (default: false)
    pub trust_proxy_headers: bool,
}

/// Twilio provider configuration
#[derive(Deserialize, Serialize, Clone)]
pub struct TwilioConfig {
    /// Twilio Account SID
    pub account_sid: Option<String>,
    /// Twilio Auth Token
    pub auth_token: Option<String>,
    /// Outbound sender number
    pub phone_number: Option<String>,
    /// REST API base URL (default: https://api.twilio.com)
    pub api_base_url: String,
    /// Provider call timeout in seconds (default: 10)
    pub timeout_seconds: u64,
    /// Public URL of the status webhook, passed to Twilio on every send
    pub status_callback_url: Option<String>,
    /// Check X-Twilio-Signature on status callbacks (default: false)
    pub verify_signatures: bool,
}

/// Credentials that are all present and non-empty.
#[derive(Clone, PartialEq, Eq)]
pub struct TwilioCredentials<'a> {
    pub account_sid: &'a str,
    pub auth_token: &'a str,
    pub phone_number: &'a str,
}

/// Security configuration
#[derive(Deserialize, Serialize, Clone)]
pub struct SecurityConfig {
    /// Static bearer token for gated endpoints; unset disables the gate
    pub api_secret_key: Option<String>,
    /// Maximum request body size in bytes (default: 1MB)
    pub max_body_size: usize,
}

/// Rate limiting configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct RateLimitConfig {
    /// Enable rate limiting (default: true)
    pub enabled: bool,
    /// Requests accepted per client per window (default: 10)
    pub max_requests: u32,
    /// Window length in seconds (default: 900)
    pub window_seconds: u64,
}

/// Outbound message shaping
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct DispatchConfig {
    /// Appended to every message body
    pub branding_suffix: String,
    /// Delivery attempts requested for emergency messages (default: 3)
    pub emergency_attempts: u32,
}

/// Logging configuration
#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct LoggingConfig {
    /// Log level (default: info)
    pub level: String,
    /// Log format: json or pretty (default: pretty)
    pub format: String,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            allowed_origin: None,
            trust_proxy_headers: false,
        }
    }
}

impl Default for TwilioConfig {
    fn default() -> Self {
        Self {
            account_sid: None,
            auth_token: None,
            phone_number: None,
            api_base_url: sms_twilio::DEFAULT_BASE_URL.to_string(),
            timeout_seconds: 10,
            status_callback_url: None,
            verify_signatures: false,
        }
    }
}

fn redacted(secret: &Option<String>) -> Option<&'static str> {
    secret.as_ref().map(|_| "<redacted>")
}

impl fmt::Debug for TwilioConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioConfig")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &redacted(&self.auth_token))
            .field("phone_number", &self.phone_number)
            .field("api_base_url", &self.api_base_url)
            .field("timeout_seconds", &self.timeout_seconds)
            .field("status_callback_url", &self.status_callback_url)
            .field("verify_signatures", &self.verify_signatures)
            .finish()
    }
}

impl fmt::Debug for TwilioCredentials<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TwilioCredentials")
            .field("account_sid", &self.account_sid)
            .field("auth_token", &"<redacted>")
            .field("phone_number", &self.phone_number)
            .finish()
    }
}

impl fmt::Debug for SecurityConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SecurityConfig")
            .field("api_secret_key", &redacted(&self.api_secret_key))
            .field("max_body_size", &self.max_body_size)
            .finish()
    }
}

impl TwilioConfig {
    pub fn credentials(&self) -> Option<TwilioCredentials<'_>> {
        fn present(value: &Option<String>) -> Option<&str> {
            value.as_deref().map(str::trim).filter(|v| !v.is_empty())
        }
        Some(TwilioCredentials {
            account_sid: present(&self.account_sid)?,
            auth_token: present(&self.auth_token)?,
            phone_number: present(&self.phone_number)?,
        })
    }

    pub fn is_configured(&self) -> bool {
        self.credentials().is_some()
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            api_secret_key: None,
            max_body_size: 1024 * 1024, // 1MB
        }
    }
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            max_requests: 10,
            window_seconds: 15 * 60,
        }
    }
}

impl Default for DispatchConfig {
    fn default() -> Self {
        Self {
            branding_suffix: "\n\n- Sent via SMS Gateway".to_string(),
            emergency_attempts: 3,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            environment: RunMode::Development,
            server: ServerConfig::default(),
            twilio: TwilioConfig::default(),
            security: SecurityConfig::default(),
            rate_limit: RateLimitConfig::default(),
            dispatch: DispatchConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Conventional flat variable names and the keys they override.
const FLAT_OVERRIDES: &[(&str, &str)] = &[
    ("TWILIO_ACCOUNT_SID", "twilio.account_sid"),
    ("TWILIO_AUTH_TOKEN", "twilio.auth_token"),
    ("TWILIO_PHONE_NUMBER", "twilio.phone_number"),
    ("PORT", "server.port"),
    ("ALLOWED_ORIGIN", "server.allowed_origin"),
    ("API_SECRET_KEY", "security.api_secret_key"),
    ("RUN_MODE", "environment"),
];

impl AppConfig {
    /// Load configuration from files and environment variables
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        let builder = Config::builder()
            // Start with default configuration
            .add_source(Config::try_from(&AppConfig::default())?)
            // Add configuration file based on environment
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // Add local configuration file (gitignored)
            .add_source(File::with_name("config/local").required(false))
            // Add environment variables (prefixed with SMSGATE__)
            .add_source(Environment::with_prefix("SMSGATE").separator("__"));

        Self::apply_flat_overrides(builder, |name| env::var(name).ok())?
            .build()?
            .try_deserialize()
    }

    /// Build configuration from defaults and the given variables only; no
    /// files, no process environment.
    pub fn from_vars(vars: HashMap<String, String>) -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(Config::try_from(&AppConfig::default())?)
            .add_source(
                Environment::with_prefix("SMSGATE")
                    .separator("__")
                    .source(Some(vars.clone())),
            );

        Self::apply_flat_overrides(builder, |name| vars.get(name).cloned())?
            .build()?
            .try_deserialize()
    }

    fn apply_flat_overrides(
        mut builder: ConfigBuilder<DefaultState>,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> Result<ConfigBuilder<DefaultState>, ConfigError> {
        for (name, key) in FLAT_OVERRIDES {
            let value = lookup(name).filter(|v| !v.is_empty());
            builder = builder.set_override_option(*key, value)?;
        }
        Ok(builder)
    }

    /// Reject combinations that would start an unsafe or broken server.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let has_api_key = self
            .security
            .api_secret_key
            .as_deref()
            .is_some_and(|k| !k.is_empty());
        if !has_api_key && !self.environment.is_development() {
            return Err(ConfigError::Message(
                "API_SECRET_KEY must be set outside development mode".into(),
            ));
        }
        if self.twilio.verify_signatures {
            if self.twilio.status_callback_url.is_none() {
                return Err(ConfigError::Message(
                    "twilio.verify_signatures requires twilio.status_callback_url".into(),
                ));
            }
            if !self.twilio.is_configured() {
                return Err(ConfigError::Message(
                    "twilio.verify_signatures requires Twilio credentials".into(),
                ));
            }
        }
        let limits = &self.rate_limit;
        if limits.enabled && (limits.window_seconds == 0 || limits.max_requests == 0) {
            return Err(ConfigError::Message(
                "rate_limit.window_seconds and rate_limit.max_requests must be non-zero".into(),
            ));
        }
        Ok(())
    }
}
