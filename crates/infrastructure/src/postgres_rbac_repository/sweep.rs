use super::*;

/// Advisory-lock key shared by every sweeper instance.
const SWEEP_LOCK_KEY: i64 = 0x636c_6176_7377_6570;

impl PostgresRbacRepository {
    pub(super) async fn deactivate_expired_impl(
        &self,
        now: DateTime<Utc>,
    ) -> AppResult<SweepOutcome> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Storage(format!("failed to begin transaction: {error}"))
        })?;

        // One sweeper at a time across all instances; losing the lock means
        // another instance is already sweeping, which is as good as done.
        let acquired = sqlx::query_scalar::<_, bool>(
            r#"
            SELECT pg_try_advisory_xact_lock($1)
            "#,
        )
        .bind(SWEEP_LOCK_KEY)
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Storage(format!("failed to acquire sweep lock: {error}")))?;

        if !acquired {
            tracing::debug!("sweep already running elsewhere; skipping");
            return Ok(SweepOutcome::default());
        }

        let assignments_deactivated = sqlx::query(
            r#"
            UPDATE rbac_user_role_assignments
            SET is_active = false
            WHERE is_active
                AND expires_at IS NOT NULL
                AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to deactivate expired assignments: {error}"))
        })?
        .rows_affected();

        let grants_deactivated = sqlx::query(
            r#"
            UPDATE rbac_resource_access_grants
            SET is_active = false
            WHERE is_active
                AND expires_at IS NOT NULL
                AND expires_at < $1
            "#,
        )
        .bind(now)
        .execute(&mut *transaction)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to deactivate expired grants: {error}"))
        })?
        .rows_affected();

        transaction.commit().await.map_err(|error| {
            AppError::Storage(format!("failed to commit transaction: {error}"))
        })?;

        Ok(SweepOutcome {
            assignments_deactivated,
            grants_deactivated,
        })
    }
}
