use serde::Deserialize;

/// Form fields Twilio posts to the WhatsApp webhook. Other fields are ignored.
#[derive(Clone, Debug, Default, Deserialize)]
pub struct WhatsAppWebhookForm {
    #[serde(rename = "From", default)]
    pub from: String,
    #[serde(rename = "Body", default)]
    pub body: String,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct InboundReply {
    pub sender: Option<String>,
    pub body: String,
}

impl From<WhatsAppWebhookForm> for InboundReply {
    fn from(form: WhatsAppWebhookForm) -> Self {
        let sender = Some(form.from.trim().to_owned()).filter(|from| !from.is_empty());
        Self { sender, body: form.body.trim().to_owned() }
    }
}

#[cfg(test)]
mod tests {
    use super::{InboundReply, WhatsAppWebhookForm};

    #[test]
    fn webhook_form_is_trimmed_into_reply() {
        let form: WhatsAppWebhookForm = serde_json::from_value(serde_json::json!({
            "From": "whatsapp:+421900000000",
            "Body": "  B=12,50\n",
            "MessageSid": "SM1",
        }))
        .expect("form");

        let reply = InboundReply::from(form);
        assert_eq!(reply.sender.as_deref(), Some("whatsapp:+421900000000"));
        assert_eq!(reply.body, "B=12,50");
    }

    #[test]
    fn missing_fields_default_to_empty() {
        let reply = InboundReply::from(WhatsAppWebhookForm::default());
        assert_eq!(reply, InboundReply { sender: None, body: String::new() });
    }
}
