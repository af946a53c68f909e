use async_trait::async_trait;

use clavis_core::AppResult;
use clavis_domain::{AuditAction, UserId};

/// Immutable audit event payload emitted by the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AuditEvent {
    /// Acting user, when the event has one.
    pub actor: Option<UserId>,
    /// Stable audit action identifier.
    pub action: AuditAction,
    /// Resource type label.
    pub resource_type: String,
    /// Resource identifier.
    pub resource_id: String,
    /// Optional event detail.
    pub detail: Option<String>,
}

/// Port to the external audit collaborator.
///
/// Emission is fire-and-forget from the engine's perspective: services log
/// and swallow a failed emit after a successful mutation rather than fail
/// the mutation itself.
#[async_trait]
pub trait AuditSink: Send + Sync {
    /// Reports one audit event.
    async fn emit(&self, event: AuditEvent) -> AppResult<()>;
}
