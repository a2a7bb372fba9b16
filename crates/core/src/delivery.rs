use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NoticeKind {
    PriceRequest,
    PriceReminder,
    PriceConfirmation,
    CorrectionRejected,
    QuoteReady,
    Apology,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct OutboundMessage {
    pub kind: NoticeKind,
    pub body: String,
    pub correlation_id: String,
}

impl OutboundMessage {
    pub fn new(
        kind: NoticeKind,
        body: impl Into<String>,
        correlation_id: impl Into<String>,
    ) -> Self {
        Self { kind, body: body.into(), correlation_id: correlation_id.into() }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeliveryReceipt {
    pub channel: String,
    pub reference: Option<String>,
}

#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum DeliveryError {
    #[error("channel is not configured: {0}")]
    NotConfigured(String),
    #[error("channel transport failed: {0}")]
    Transport(String),
    #[error("channel rejected message with status {status}: {body}")]
    Rejected { status: u16, body: String },
}

/// Outbound side of the reply channel (chat message or email body).
#[async_trait]
pub trait ReplyChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError>;
}

#[derive(Clone, Default)]
pub struct RecordingChannel {
    messages: Arc<Mutex<Vec<OutboundMessage>>>,
    fail: bool,
}

impl RecordingChannel {
    /// Records every message but reports each send as a transport failure.
    pub fn failing() -> Self {
        Self { messages: Arc::default(), fail: true }
    }

    pub fn messages(&self) -> Vec<OutboundMessage> {
        match self.messages.lock() {
            Ok(messages) => messages.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn kinds(&self) -> Vec<NoticeKind> {
        self.messages().iter().map(|message| message.kind).collect()
    }
}

#[async_trait]
impl ReplyChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        "recording"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        match self.messages.lock() {
            Ok(mut messages) => messages.push(message.clone()),
            Err(poisoned) => poisoned.into_inner().push(message.clone()),
        }

        if self.fail {
            return Err(DeliveryError::Transport("recording channel set to fail".to_owned()));
        }
        Ok(DeliveryReceipt { channel: self.name().to_owned(), reference: None })
    }
}

#[cfg(test)]
mod tests {
    use super::{DeliveryError, NoticeKind, OutboundMessage, RecordingChannel, ReplyChannel};

    #[tokio::test]
    async fn recording_channel_keeps_messages_in_send_order() {
        let channel = RecordingChannel::default();
        channel
            .send(&OutboundMessage::new(NoticeKind::PriceRequest, "first", "req-1"))
            .await
            .expect("send");
        channel
            .send(&OutboundMessage::new(NoticeKind::QuoteReady, "second", "req-1"))
            .await
            .expect("send");

        assert_eq!(channel.kinds(), vec![NoticeKind::PriceRequest, NoticeKind::QuoteReady]);
        assert_eq!(channel.messages()[1].body, "second");
    }

    #[tokio::test]
    async fn failing_channel_still_records_attempts() {
        let channel = RecordingChannel::failing();
        let result =
            channel.send(&OutboundMessage::new(NoticeKind::Apology, "sorry", "req-2")).await;

        assert!(matches!(result, Err(DeliveryError::Transport(_))));
        assert_eq!(channel.messages().len(), 1);
    }
}
