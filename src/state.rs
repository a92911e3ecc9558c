use sms_core::{SmsClient, StatusWebhook};
use sms_twilio::TwilioClient;
use std::sync::Arc;
use tracing::{info, warn};

use crate::auth::ApiKeyGate;
use crate::config::AppConfig;
use crate::dispatcher::Dispatcher;
use crate::rate_limiter::RateLimiter;

/// Shared, immutable-after-startup handler state.
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<AppConfig>,
    /// `None` when provider credentials are missing.
    pub dispatcher: Option<Arc<Dispatcher>>,
    pub status_webhook: Option<Arc<dyn StatusWebhook>>,
    pub gate: ApiKeyGate,
    pub limiter: RateLimiter,
}

impl AppState {
    /// Wires a Twilio client when credentials are configured.
    pub fn from_config(config: AppConfig) -> Self {
        let twilio = config.twilio.credentials().map(|creds| {
            let mut client = TwilioClient::with_base_url(
                creds.account_sid,
                creds.auth_token,
                config.twilio.api_base_url.clone(),
            )
            .with_timeout(config.twilio.timeout());
            if let Some(url) = &config.twilio.status_callback_url {
                client = client.with_status_callback(url.clone());
            }
            (Arc::new(client), creds.phone_number.to_string())
        });

        match twilio {
            Some((client, sender)) => {
                info!(account_sid = %client.account_sid, "Twilio client configured");
                let webhook: Arc<dyn StatusWebhook> = client.clone();
                let provider: Arc<dyn SmsClient> = client;
                Self::build(config, Some((provider, sender)), Some(webhook))
            }
            None => {
                warn!("Twilio credentials missing; /send-sms will answer TWILIO_NOT_CONFIGURED");
                Self::build(config, None, None)
            }
        }
    }

    /// Uses `client` as the provider regardless of configured credentials.
    pub fn with_client(config: AppConfig, client: Arc<dyn SmsClient>, sender: impl Into<String>) -> Self {
        Self::build(config, Some((client, sender.into())), None)
    }

    fn build(
        config: AppConfig,
        provider: Option<(Arc<dyn SmsClient>, String)>,
        status_webhook: Option<Arc<dyn StatusWebhook>>,
    ) -> Self {
        let dispatcher = provider.map(|(client, sender)| {
            Arc::new(
                Dispatcher::new(client, sender, &config.dispatch)
                    .with_status_callback(config.twilio.status_callback_url.clone()),
            )
        });

        Self {
            gate: ApiKeyGate::from_config(&config.security),
            limiter: RateLimiter::new(&config.rate_limit),
            dispatcher,
            status_webhook,
            config: Arc::new(config),
        }
    }

    pub fn provider_configured(&self) -> bool {
        self.dispatcher.is_some()
    }
}
