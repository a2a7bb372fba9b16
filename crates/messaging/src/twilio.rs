use std::time::Duration;

use async_trait::async_trait;
use quoteline_core::config::MessagingConfig;
use quoteline_core::{DeliveryError, DeliveryReceipt, OutboundMessage, ReplyChannel};
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

const SEND_TIMEOUT: Duration = Duration::from_secs(15);

/// Sends every notice to the manager's WhatsApp number through Twilio.
#[derive(Clone)]
pub struct TwilioWhatsAppChannel {
    client: reqwest::Client,
    endpoint: String,
    account_sid: String,
    auth_token: SecretString,
    from: String,
    to: String,
}

#[derive(Deserialize)]
struct MessageResource {
    sid: Option<String>,
}

fn required(value: &Option<String>, field: &str) -> Result<String, DeliveryError> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_owned)
        .ok_or_else(|| DeliveryError::NotConfigured(format!("twilio {field} is missing")))
}

impl TwilioWhatsAppChannel {
    pub fn from_config(config: &MessagingConfig) -> Result<Self, DeliveryError> {
        let account_sid = required(&config.twilio_account_sid, "account sid")?;
        let auth_token = config
            .twilio_auth_token
            .clone()
            .filter(|token| !token.expose_secret().trim().is_empty())
            .ok_or_else(|| DeliveryError::NotConfigured("twilio auth token is missing".into()))?;
        let from = required(&config.whatsapp_from, "whatsapp sender")?;
        let to = required(&config.manager_whatsapp_to, "whatsapp recipient")?;

        let client = reqwest::Client::builder()
            .timeout(SEND_TIMEOUT)
            .build()
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        Ok(Self {
            client,
            endpoint: format!(
                "{}/2010-04-01/Accounts/{account_sid}/Messages.json",
                config.twilio_api_base.trim_end_matches('/')
            ),
            account_sid,
            auth_token,
            from,
            to,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    fn form<'a>(&'a self, message: &'a OutboundMessage) -> [(&'static str, &'a str); 3] {
        [("From", self.from.as_str()), ("To", self.to.as_str()), ("Body", message.body.as_str())]
    }
}

#[async_trait]
impl ReplyChannel for TwilioWhatsAppChannel {
    fn name(&self) -> &'static str {
        "twilio_whatsapp"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        let response = self
            .client
            .post(&self.endpoint)
            .basic_auth(&self.account_sid, Some(self.auth_token.expose_secret()))
            .form(&self.form(message))
            .send()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(DeliveryError::Rejected { status: status.as_u16(), body });
        }

        let resource: MessageResource = response
            .json()
            .await
            .map_err(|error| DeliveryError::Transport(error.to_string()))?;
        debug!(
            event_name = "delivery.twilio.accepted",
            correlation_id = %message.correlation_id,
            sid = resource.sid.as_deref().unwrap_or("-"),
            "twilio accepted message"
        );
        Ok(DeliveryReceipt { channel: self.name().to_owned(), reference: resource.sid })
    }
}
