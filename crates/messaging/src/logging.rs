use async_trait::async_trait;
use quoteline_core::{DeliveryError, DeliveryReceipt, OutboundMessage, ReplyChannel};
use tracing::info;

/// No-op delivery: the notice only lands in the log.
#[derive(Clone, Copy, Debug, Default)]
pub struct LoggingChannel;

#[async_trait]
impl ReplyChannel for LoggingChannel {
    fn name(&self) -> &'static str {
        "log"
    }

    async fn send(&self, message: &OutboundMessage) -> Result<DeliveryReceipt, DeliveryError> {
        info!(
            event_name = "delivery.logged",
            correlation_id = %message.correlation_id,
            kind = ?message.kind,
            body = %message.body,
            "notice not sent; messaging is not configured"
        );
        Ok(DeliveryReceipt { channel: self.name().to_owned(), reference: None })
    }
}
