//! Audit persistence

use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::PgPool;

use super::types::{AuditAction, AuditError, AuditEvent};

/// Append-only destination for audit events
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn append(&self, event: &AuditEvent) -> Result<(), AuditError>;
}

/// Writes to the `audit_logs` table
#[derive(Debug, Clone)]
pub struct PgAuditSink {
    pool: PgPool,
}

impl PgAuditSink {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PgAuditSink {
    async fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        sqlx::query(
            "INSERT INTO audit_logs \
             (id, timestamp, action, actor, success, ip_address, user_agent, details) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8)",
        )
        .bind(&event.id)
        .bind(event.timestamp)
        .bind(event.action.as_str())
        .bind(&event.actor)
        .bind(event.success)
        .bind(&event.ip_address)
        .bind(&event.user_agent)
        .bind(&event.details)
        .execute(&self.pool)
        .await?;
        Ok(())
    }
}

/// Keeps events in memory (development and tests)
#[derive(Debug, Clone, Default)]
pub struct MemoryAuditSink {
    events: Arc<Mutex<Vec<AuditEvent>>>,
}

impl MemoryAuditSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Vec<AuditEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_default()
    }

    pub fn by_action(&self, action: AuditAction) -> Vec<AuditEvent> {
        self.snapshot()
            .into_iter()
            .filter(|e| e.action == action)
            .collect()
    }
}

#[async_trait]
impl AuditSink for MemoryAuditSink {
    async fn append(&self, event: &AuditEvent) -> Result<(), AuditError> {
        // A poisoned lock only means another writer panicked mid-push
        let mut events = self
            .events
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        events.push(event.clone());
        Ok(())
    }
}
