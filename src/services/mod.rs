pub mod admin_service;
pub mod audit;
pub mod decision_cache;

pub use admin_service::{
    AdminDecision, AdminError, AdminService, ReconcileAction, Reconciliation, VerifyMethod,
};
pub use audit::{AuditEvent, AuditSink, NoopAuditSink, TracingAuditSink};
pub use decision_cache::DecisionCache;
