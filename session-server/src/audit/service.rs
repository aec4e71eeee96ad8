//! Audit service
//!
//! Handlers hand events to `AuditService::log`; the worker persists them.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::types::{AuditError, AuditEvent};

#[derive(Debug)]
pub struct AuditService {
    tx: mpsc::Sender<AuditEvent>,
}

impl AuditService {
    /// Create the service and the receiver the worker consumes
    pub fn new(buffer_size: usize) -> (Arc<Self>, mpsc::Receiver<AuditEvent>) {
        let (tx, rx) = mpsc::channel(buffer_size.max(1));
        (Arc::new(Self { tx }), rx)
    }

    /// Queue an event, waiting for capacity when the buffer is full
    pub async fn log(&self, event: AuditEvent) {
        if let Err(e) = self.try_log(event).await {
            tracing::error!(target: "audit", error = %e, "Audit event lost");
        }
    }

    pub async fn try_log(&self, event: AuditEvent) -> Result<(), AuditError> {
        self.tx
            .send(event)
            .await
            .map_err(|_| AuditError::ChannelClosed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audit::AuditAction;

    #[tokio::test]
    async fn test_events_reach_receiver_in_order() {
        let (service, mut rx) = AuditService::new(4);
        service.log(AuditEvent::new(AuditAction::LoginFailed, false)).await;
        service.log(AuditEvent::new(AuditAction::LoginSuccess, true)).await;

        assert_eq!(rx.recv().await.unwrap().action, AuditAction::LoginFailed);
        assert_eq!(rx.recv().await.unwrap().action, AuditAction::LoginSuccess);
    }

    #[tokio::test]
    async fn test_closed_channel_reported() {
        let (service, rx) = AuditService::new(1);
        drop(rx);
        let err = service
            .try_log(AuditEvent::new(AuditAction::Logout, true))
            .await
            .unwrap_err();
        assert!(matches!(err, AuditError::ChannelClosed));
    }
}
