use async_trait::async_trait;
use sqlx::PgPool;

use clavis_application::{AuditEvent, AuditSink};
use clavis_core::{AppError, AppResult};

/// Audit sink that appends events to the `rbac_audit_events` table.
#[derive(Clone)]
pub struct PostgresAuditSink {
    pool: PgPool,
}

impl PostgresAuditSink {
    /// Creates a sink with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AuditSink for PostgresAuditSink {
    async fn emit(&self, event: AuditEvent) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_audit_events (actor, action, resource_type, resource_id, detail)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(event.actor.map(|actor| actor.as_uuid()))
        .bind(event.action.as_str())
        .bind(event.resource_type.as_str())
        .bind(event.resource_id.as_str())
        .bind(event.detail.as_deref())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to record audit event: {error}")))?;

        Ok(())
    }
}
