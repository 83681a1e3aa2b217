//! Out-of-band notification seam
//!
//! Channel adapters (chat bots, SMS, e-mail) implement [`OutOfBandNotifier`].
//! The approval manager only needs "send this text to this recipient".

use async_trait::async_trait;
use thiserror::Error;
use tracing::info;

/// Notification delivery errors
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum NotifyError {
    #[error("Delivery failed: {0}")]
    Delivery(String),

    #[error("Notification channel unavailable: {0}")]
    Unavailable(String),
}

/// Acknowledgement from the notification channel
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeliveryReceipt {
    /// Channel-specific message identifier, if any
    pub message_id: Option<String>,
}

/// Sends a message to a recipient over a channel distinct from the requester's
#[async_trait]
pub trait OutOfBandNotifier: Send + Sync {
    /// Deliver `message` to `recipient_id`
    async fn send(
        &self,
        recipient_id: &str,
        message: &str,
    ) -> std::result::Result<DeliveryReceipt, NotifyError>;
}

/// Notifier that only records the dispatch in the log.
///
/// Message bodies carry confirmation codes, so only the length is logged.
#[derive(Debug, Clone, Copy, Default)]
pub struct LogNotifier;

#[async_trait]
impl OutOfBandNotifier for LogNotifier {
    async fn send(
        &self,
        recipient_id: &str,
        message: &str,
    ) -> std::result::Result<DeliveryReceipt, NotifyError> {
        info!(
            recipient = recipient_id,
            bytes = message.len(),
            "Approval notification (log only)"
        );
        Ok(DeliveryReceipt::default())
    }
}
