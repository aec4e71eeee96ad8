//! Audit event types

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Audited authentication actions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    LoginSuccess,
    LoginFailed,
    Logout,
}

impl AuditAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::LoginSuccess => "login_success",
            Self::LoginFailed => "login_failed",
            Self::Logout => "logout",
        }
    }
}

impl std::fmt::Display for AuditAction {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One audit record (immutable once written)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuditEvent {
    pub id: String,
    /// Unix millis
    pub timestamp: i64,
    pub action: AuditAction,
    /// User id when known, otherwise the submitted username
    pub actor: Option<String>,
    pub success: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub details: serde_json::Value,
}

impl AuditEvent {
    pub fn new(action: AuditAction, success: bool) -> Self {
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: shared::util::now_millis(),
            action,
            actor: None,
            success,
            ip_address: None,
            user_agent: None,
            details: serde_json::Value::Object(Default::default()),
        }
    }

    pub fn actor(mut self, actor: impl Into<String>) -> Self {
        let actor = actor.into();
        if !actor.is_empty() {
            self.actor = Some(actor);
        }
        self
    }

    pub fn client(mut self, ip: impl Into<String>, user_agent: Option<String>) -> Self {
        self.ip_address = Some(ip.into());
        self.user_agent = user_agent;
        self
    }

    pub fn details(mut self, details: serde_json::Value) -> Self {
        self.details = details;
        self
    }
}

#[derive(Debug, Error)]
pub enum AuditError {
    #[error("audit storage error: {0}")]
    Storage(#[from] sqlx::Error),

    #[error("audit channel closed")]
    ChannelClosed,
}
