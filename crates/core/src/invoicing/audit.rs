//! Best-effort audit trail.

use serde_json::Value;
use tracing::warn;
use uuid::Uuid;

use super::repository::AuditLogRepository;
use super::types::{AuditEntityType, NewAuditEntry};

/// Actor recorded for actions performed by the service itself.
pub const SYSTEM_ACTOR: &str = "system";

/// Audit action names.
pub mod actions {
    /// Pending invoice inserted.
    pub const INVOICE_CREATED: &str = "invoice_created";
    /// Invoice reached `sent`.
    pub const INVOICE_SENT: &str = "invoice_sent";
    /// Invoice marked `failed`.
    pub const INVOICE_FAILED: &str = "invoice_failed";
    /// Failed invoice removed ahead of a retry.
    pub const INVOICE_DELETED_FOR_RETRY: &str = "invoice_deleted_for_retry";
    /// Local monthly pratica inserted.
    pub const PRATICA_CREATED: &str = "pratica_created";
    /// Remote aggregate created and linked.
    pub const PRATICA_REMOTE_CREATED: &str = "pratica_remote_created";
    /// Remote aggregate creation failed.
    pub const PRATICA_REMOTE_FAILED: &str = "pratica_remote_failed";
    /// Pratica finalized.
    pub const PRATICA_FINALIZED: &str = "pratica_finalized";
}

/// Builder for one audit entry.
#[derive(Debug, Clone)]
pub(crate) struct AuditEvent {
    entry: NewAuditEntry,
}

impl AuditEvent {
    pub(crate) fn new(entity_type: AuditEntityType, entity_id: Uuid, action: &'static str) -> Self {
        Self {
            entry: NewAuditEntry {
                entity_type,
                entity_id,
                action,
                old_status: None,
                new_status: None,
                details: Value::Object(serde_json::Map::new()),
                actor: SYSTEM_ACTOR.to_string(),
            },
        }
    }

    pub(crate) fn transition(mut self, old: Option<&str>, new: Option<&str>) -> Self {
        self.entry.old_status = old.map(str::to_string);
        self.entry.new_status = new.map(str::to_string);
        self
    }

    pub(crate) fn details(mut self, details: Value) -> Self {
        self.entry.details = details;
        self
    }

    pub(crate) fn actor(mut self, actor: &str) -> Self {
        self.entry.actor = actor.to_string();
        self
    }

    /// Appends the entry. Failures are logged and swallowed.
    pub(crate) async fn record<R: AuditLogRepository>(self, repo: &R) {
        let action = self.entry.action;
        let entity_id = self.entry.entity_id;
        if let Err(err) = repo.append(self.entry).await {
            warn!(
                action,
                entity_id = %entity_id,
                error = %err,
                "Failed to write audit log entry"
            );
        }
    }
}
