use serde::{Deserialize, Serialize};
use tracing::info;

/// One outbound message, addressed but not yet delivered.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationPayload {
    pub recipient: String,
    pub channel: String,
    pub message: String,
}

impl NotificationPayload {
    pub fn new(
        recipient: impl Into<String>,
        channel: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            recipient: recipient.into(),
            channel: channel.into(),
            message: message.into(),
        }
    }
}

/// Delivery seam for customer and supervisor messages. The lifecycle code
/// only talks to this trait; swapping in SMS, email, or a test recorder is
/// a constructor argument away.
pub trait NotificationSink: Send + Sync {
    fn notify_customer(&self, payload: NotificationPayload);
    fn notify_supervisor(&self, payload: NotificationPayload);
}

/// Default sink: writes both directions to the log.
pub struct ConsoleNotifier;

impl NotificationSink for ConsoleNotifier {
    fn notify_customer(&self, payload: NotificationPayload) {
        info!(
            target: "frontdesk_manager::notify",
            recipient = %payload.recipient,
            channel = %payload.channel,
            "[CUSTOMER NOTIFY] {}",
            payload.message
        );
    }

    fn notify_supervisor(&self, payload: NotificationPayload) {
        info!(
            target: "frontdesk_manager::notify",
            recipient = %payload.recipient,
            channel = %payload.channel,
            "[SUPERVISOR ALERT] {}",
            payload.message
        );
    }
}
