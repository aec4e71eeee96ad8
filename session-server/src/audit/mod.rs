//! Audit trail for authentication events
//!
//! ```text
//! login / logout handler
//!   └─ AuditService::log() → mpsc → AuditWorker → AuditSink (audit_logs table | memory)
//!                                              └─ tracing target "audit"
//! ```
//!
//! The channel is bounded and `log` awaits capacity, so events are never
//! dropped while the worker is alive.

pub mod service;
pub mod sink;
pub mod types;
pub mod worker;

pub use service::AuditService;
pub use sink::{AuditSink, MemoryAuditSink, PgAuditSink};
pub use types::{AuditAction, AuditError, AuditEvent};
pub use worker::AuditWorker;
