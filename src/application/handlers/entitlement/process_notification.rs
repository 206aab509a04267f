//! ProcessNotificationHandler - Command handler for inbound provider notifications.

use std::sync::Arc;

use crate::domain::entitlement::{EntitlementError, InboundNotification};

use super::{NotificationParser, ReconciliationEngine, ReconciliationOutcome};

/// Raw delivery as it reached the notification endpoint.
#[derive(Debug, Clone)]
pub struct ProcessNotificationCommand {
    /// Web signature header, when present.
    pub signature: Option<String>,
    pub body: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessNotificationResult {
    Handled(ReconciliationOutcome),
    /// Shape not recognized or nothing to act on. Acknowledged so the
    /// provider stops retrying.
    Unrecognized,
    /// Body could not be read as any provider shape. Acknowledged as invalid
    /// without touching plan state.
    Malformed,
}

pub struct ProcessNotificationHandler {
    parser: Arc<NotificationParser>,
    engine: Arc<ReconciliationEngine>,
}

impl ProcessNotificationHandler {
    pub fn new(parser: Arc<NotificationParser>, engine: Arc<ReconciliationEngine>) -> Self {
        Self { parser, engine }
    }

    pub async fn handle(
        &self,
        cmd: ProcessNotificationCommand,
    ) -> Result<ProcessNotificationResult, EntitlementError> {
        let inbound = match InboundNotification::classify(cmd.signature.as_deref(), &cmd.body) {
            Ok(inbound) => inbound,
            Err(err) => {
                tracing::warn!(error = %err, "Malformed notification body");
                return Ok(ProcessNotificationResult::Malformed);
            }
        };
        let kind = inbound.kind();

        let notification = match self.parser.parse(&inbound).await {
            Ok(Some(notification)) => notification,
            Ok(None) => {
                tracing::info!(kind, "Notification not actionable");
                return Ok(ProcessNotificationResult::Unrecognized);
            }
            Err(EntitlementError::Trust(err)) => {
                tracing::warn!(kind, error = %err, "Notification failed trust verification");
                return Err(EntitlementError::Trust(err));
            }
            Err(err) => {
                tracing::error!(kind, error = %err, "Failed to parse notification");
                return Err(err);
            }
        };

        tracing::info!(
            kind,
            action = ?notification.action,
            external_id = %notification.external_id,
            "Applying notification"
        );
        let outcome = self.engine.apply(&notification).await?;
        Ok(ProcessNotificationResult::Handled(outcome))
    }
}
