use super::*;

impl PostgresRbacRepository {
    pub(super) async fn upsert_resource_grant_impl(
        &self,
        grant: ResourceAccessGrant,
    ) -> AppResult<()> {
        let actions: Vec<String> = grant.actions.iter().cloned().collect();

        sqlx::query(
            r#"
            INSERT INTO rbac_resource_access_grants (
                id, user_id, resource_type, resource_id, actions,
                granted_by, granted_at, expires_at, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (user_id, resource_type, resource_id) WHERE is_active
            DO UPDATE SET
                actions = EXCLUDED.actions,
                granted_by = EXCLUDED.granted_by,
                granted_at = EXCLUDED.granted_at,
                expires_at = EXCLUDED.expires_at
            "#,
        )
        .bind(grant.id.as_uuid())
        .bind(grant.user_id.as_uuid())
        .bind(grant.resource_type.as_str())
        .bind(grant.resource_id.as_str())
        .bind(&actions)
        .bind(grant.granted_by.as_uuid())
        .bind(grant.granted_at)
        .bind(grant.expires_at)
        .bind(grant.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to upsert grant: {error}")))?;

        Ok(())
    }

    pub(super) async fn find_active_resource_grant_impl(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<Option<ResourceAccessGrant>> {
        let row = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT id, user_id, resource_type, resource_id, actions,
                granted_by, granted_at, expires_at, is_active
            FROM rbac_resource_access_grants
            WHERE user_id = $1
                AND resource_type = $2
                AND resource_id = $3
                AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(resource_type)
        .bind(resource_id)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load grant: {error}")))?;

        Ok(row.map(GrantRow::into_grant))
    }

    pub(super) async fn deactivate_resource_grant_impl(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_resource_access_grants
            SET is_active = false
            WHERE user_id = $1
                AND resource_type = $2
                AND resource_id = $3
                AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(resource_type)
        .bind(resource_id)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to deactivate grant: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn list_active_grants_for_user_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<ResourceAccessGrant>> {
        let rows = sqlx::query_as::<_, GrantRow>(
            r#"
            SELECT id, user_id, resource_type, resource_id, actions,
                granted_by, granted_at, expires_at, is_active
            FROM rbac_resource_access_grants
            WHERE user_id = $1
                AND is_active
            ORDER BY granted_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list grants: {error}")))?;

        Ok(rows.into_iter().map(GrantRow::into_grant).collect())
    }
}
