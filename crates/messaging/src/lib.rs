//! Reply-channel adapters for quoteline.
//!
//! - `logging`: records each notice in the structured log and reports it delivered
//! - `twilio`: WhatsApp delivery through the Twilio Messages REST API
//! - `inbound`: normalises the WhatsApp webhook form into an `InboundReply`

pub mod inbound;
pub mod logging;
pub mod twilio;

use std::sync::Arc;

use quoteline_core::config::{MessagingConfig, MessagingProvider};
use quoteline_core::{DeliveryError, ReplyChannel};

pub use inbound::{InboundReply, WhatsAppWebhookForm};
pub use logging::LoggingChannel;
pub use twilio::TwilioWhatsAppChannel;

pub fn channel_from_config(
    config: &MessagingConfig,
) -> Result<Arc<dyn ReplyChannel>, DeliveryError> {
    match config.effective_provider() {
        MessagingProvider::Twilio => Ok(Arc::new(TwilioWhatsAppChannel::from_config(config)?)),
        MessagingProvider::Log | MessagingProvider::Auto => Ok(Arc::new(LoggingChannel)),
    }
}

#[cfg(test)]
mod tests {
    use quoteline_core::config::{AppConfig, MessagingProvider};

    use super::channel_from_config;

    #[test]
    fn auto_without_credentials_selects_logging_channel() {
        let config = AppConfig::default();
        let channel = channel_from_config(&config.messaging).expect("channel");
        assert_eq!(channel.name(), "log");
    }

    #[test]
    fn auto_with_full_credentials_selects_twilio() {
        let mut messaging = AppConfig::default().messaging;
        messaging.twilio_account_sid = Some("AC123".to_owned());
        messaging.twilio_auth_token = Some("token".to_owned().into());
        messaging.whatsapp_from = Some("whatsapp:+14155238886".to_owned());
        messaging.manager_whatsapp_to = Some("whatsapp:+421900000000".to_owned());

        let channel = channel_from_config(&messaging).expect("channel");
        assert_eq!(channel.name(), "twilio_whatsapp");
    }

    #[test]
    fn explicit_twilio_without_credentials_is_not_configured() {
        let mut messaging = AppConfig::default().messaging;
        messaging.provider = MessagingProvider::Twilio;

        let error = channel_from_config(&messaging).err().expect("missing credentials");
        assert!(error.to_string().contains("twilio"));
    }
}
