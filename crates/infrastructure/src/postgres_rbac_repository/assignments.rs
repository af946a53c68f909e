use super::*;

impl PostgresRbacRepository {
    pub(super) async fn insert_assignment_impl(
        &self,
        assignment: UserRoleAssignment,
    ) -> AppResult<bool> {
        // The partial unique index on active pairs arbitrates concurrent
        // inserts; losing the race reads back as "already assigned".
        let rows_affected = sqlx::query(
            r#"
            INSERT INTO rbac_user_role_assignments (
                id, user_id, role_id, assigned_by, assigned_at, expires_at, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            ON CONFLICT (user_id, role_id) WHERE is_active DO NOTHING
            "#,
        )
        .bind(assignment.id.as_uuid())
        .bind(assignment.user_id.as_uuid())
        .bind(assignment.role_id.as_uuid())
        .bind(assignment.assigned_by.as_uuid())
        .bind(assignment.assigned_at)
        .bind(assignment.expires_at)
        .bind(assignment.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to insert assignment: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn find_active_assignment_impl(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleAssignment>> {
        let row = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, user_id, role_id, assigned_by, assigned_at, expires_at, is_active
            FROM rbac_user_role_assignments
            WHERE user_id = $1
                AND role_id = $2
                AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load assignment: {error}")))?;

        Ok(row.map(AssignmentRow::into_assignment))
    }

    pub(super) async fn count_active_assignments_for_role_impl(
        &self,
        role_id: RoleId,
    ) -> AppResult<u64> {
        let count = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM rbac_user_role_assignments
            WHERE role_id = $1
                AND is_active
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_one(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to count assignments: {error}")))?;

        Ok(u64::try_from(count).unwrap_or_default())
    }

    pub(super) async fn deactivate_assignment_impl(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_user_role_assignments
            SET is_active = false
            WHERE user_id = $1
                AND role_id = $2
                AND is_active
            "#,
        )
        .bind(user_id.as_uuid())
        .bind(role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to deactivate assignment: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn list_active_assignments_for_user_impl(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        let rows = sqlx::query_as::<_, AssignmentRow>(
            r#"
            SELECT id, user_id, role_id, assigned_by, assigned_at, expires_at, is_active
            FROM rbac_user_role_assignments
            WHERE user_id = $1
                AND is_active
            ORDER BY assigned_at
            "#,
        )
        .bind(user_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list assignments: {error}")))?;

        Ok(rows.into_iter().map(AssignmentRow::into_assignment).collect())
    }
}
