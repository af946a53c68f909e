use async_trait::async_trait;

use clavis_application::{AuditEvent, AuditSink};
use clavis_core::AppResult;

/// Audit sink that writes events to the structured log stream.
///
/// Suitable for deployments whose log pipeline is the audit system of
/// record.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingAuditSink;

impl TracingAuditSink {
    /// Creates a tracing-backed audit sink.
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl AuditSink for TracingAuditSink {
    async fn emit(&self, event: AuditEvent) -> AppResult<()> {
        tracing::info!(
            actor = event.actor.map(|actor| actor.to_string()).unwrap_or_default(),
            action = event.action.as_str(),
            resource_type = %event.resource_type,
            resource_id = %event.resource_id,
            detail = event.detail.as_deref().unwrap_or_default(),
            "audit event"
        );
        Ok(())
    }
}
