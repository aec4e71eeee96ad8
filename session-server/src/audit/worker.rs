//! Audit background worker
//!
//! Consumes events from the channel and exits once every sender is dropped.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::sink::AuditSink;
use super::types::AuditEvent;

pub struct AuditWorker {
    sink: Arc<dyn AuditSink>,
}

impl AuditWorker {
    pub fn new(sink: Arc<dyn AuditSink>) -> Self {
        Self { sink }
    }

    /// Run until the channel closes
    pub async fn run(self, mut rx: mpsc::Receiver<AuditEvent>) {
        tracing::info!("Audit worker started");

        while let Some(event) = rx.recv().await {
            tracing::info!(
                target: "audit",
                action = %event.action,
                success = event.success,
                actor = event.actor.as_deref().unwrap_or("-"),
                ip = event.ip_address.as_deref().unwrap_or("-"),
                details = %event.details,
                "audit event"
            );

            if let Err(e) = self.sink.append(&event).await {
                tracing::error!(target: "audit", error = %e, id = %event.id, "Failed to persist audit event");
            }
        }

        tracing::info!("Audit channel closed, worker stopping");
    }
}
