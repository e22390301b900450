use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Serialize;
use uuid::Uuid;

use super::admin_service::{AdminDecision, ReconcileAction};
use crate::auth::Identity;

pub const AUDIT_TARGET: &str = "armazem_api::audit";

/// Structured record of one authorization decision or profile
/// reconciliation.
#[derive(Debug, Clone, Serialize)]
pub struct AuditEvent {
    pub user_id: Uuid,
    pub email: String,
    pub action: &'static str,
    pub method: Option<&'static str>,
    pub success: bool,
    pub error: Option<String>,
    pub at: DateTime<Utc>,
}

impl AuditEvent {
    pub fn verification(identity: &Identity, decision: &AdminDecision) -> Self {
        Self {
            user_id: identity.id,
            email: identity.email.clone(),
            action: "admin_verify",
            method: Some(decision.method.as_str()),
            success: decision.is_admin,
            error: decision.error.clone(),
            at: Utc::now(),
        }
    }

    pub fn reconciliation(identity: &Identity, action: ReconcileAction) -> Self {
        Self {
            user_id: identity.id,
            email: identity.email.clone(),
            action: "profile_reconcile",
            method: Some(action.as_str()),
            success: true,
            error: None,
            at: Utc::now(),
        }
    }
}

/// Destination for audit events. Recording is fire-and-forget:
/// implementations swallow their own failures and never block a decision.
#[async_trait]
pub trait AuditSink: Send + Sync {
    async fn record(&self, event: AuditEvent);
}

/// Default sink: one structured line per event on the audit target.
pub struct TracingAuditSink;

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn record(&self, event: AuditEvent) {
        tracing::info!(
            target: AUDIT_TARGET,
            user_id = %event.user_id,
            email = %event.email,
            action = event.action,
            method = event.method.unwrap_or("-"),
            success = event.success,
            error = event.error.as_deref().unwrap_or(""),
            at = %event.at,
            "authorization event"
        );
    }
}

/// Sink used when audit logging is disabled by configuration.
pub struct NoopAuditSink;

#[async_trait]
impl AuditSink for NoopAuditSink {
    async fn record(&self, _event: AuditEvent) {}
}
