use super::*;

impl PostgresRbacRepository {
    pub(super) async fn insert_role_impl(&self, role: Role) -> AppResult<()> {
        let max_users = role
            .max_users
            .map(i32::try_from)
            .transpose()
            .map_err(|_| {
                AppError::Validation("role max_users exceeds supported range".to_owned())
            })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_roles (
                id, name, display_name, priority, is_system, max_users, expires_at, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            "#,
        )
        .bind(role.id.as_uuid())
        .bind(role.name.as_str())
        .bind(role.display_name.as_str())
        .bind(role.priority)
        .bind(role.is_system)
        .bind(max_users)
        .bind(role.expires_at)
        .bind(role.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_conflict(
                error,
                AppError::Conflict(format!("role '{}' already exists", role.name.as_str())),
            )
        })?;

        Ok(())
    }

    pub(super) async fn find_role_impl(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, priority, is_system, max_users, expires_at, is_active
            FROM rbac_roles
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load role: {error}")))?
        .map(RoleRow::into_role)
        .transpose()
    }

    pub(super) async fn find_role_by_name_impl(&self, name: &str) -> AppResult<Option<Role>> {
        sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, priority, is_system, max_users, expires_at, is_active
            FROM rbac_roles
            WHERE name = $1
            "#,
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load role by name: {error}")))?
        .map(RoleRow::into_role)
        .transpose()
    }

    pub(super) async fn list_roles_impl(&self) -> AppResult<Vec<Role>> {
        let rows = sqlx::query_as::<_, RoleRow>(
            r#"
            SELECT id, name, display_name, priority, is_system, max_users, expires_at, is_active
            FROM rbac_roles
            ORDER BY priority DESC, name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list roles: {error}")))?;

        rows.into_iter().map(RoleRow::into_role).collect()
    }

    pub(super) async fn set_role_active_impl(
        &self,
        role_id: RoleId,
        is_active: bool,
    ) -> AppResult<()> {
        let rows_affected = sqlx::query(
            r#"
            UPDATE rbac_roles
            SET is_active = $2
            WHERE id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to update role: {error}")))?
        .rows_affected();

        if rows_affected == 0 {
            return Err(AppError::NotFound(format!(
                "role '{role_id}' was not found"
            )));
        }

        Ok(())
    }

    pub(super) async fn insert_permission_impl(&self, permission: Permission) -> AppResult<()> {
        let conditions = serde_json::to_value(&permission.conditions).map_err(|error| {
            AppError::Storage(format!("failed to encode permission conditions: {error}"))
        })?;

        sqlx::query(
            r#"
            INSERT INTO rbac_permissions (
                id, name, resource_type, action, scope, conditions, is_active
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7)
            "#,
        )
        .bind(permission.id.as_uuid())
        .bind(permission.name.as_str())
        .bind(permission.resource_type.as_str())
        .bind(permission.action.as_str())
        .bind(permission.scope.as_str())
        .bind(conditions)
        .bind(permission.is_active)
        .execute(&self.pool)
        .await
        .map_err(|error| {
            map_unique_conflict(
                error,
                AppError::Conflict(format!(
                    "permission '{}' already exists",
                    permission.name.as_str()
                )),
            )
        })?;

        Ok(())
    }

    pub(super) async fn find_permission_impl(
        &self,
        permission_id: PermissionId,
    ) -> AppResult<Option<Permission>> {
        sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, resource_type, action, scope, conditions, is_active
            FROM rbac_permissions
            WHERE id = $1
            "#,
        )
        .bind(permission_id.as_uuid())
        .fetch_optional(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load permission: {error}")))?
        .map(PermissionRow::into_permission)
        .transpose()
    }

    pub(super) async fn list_permissions_impl(&self) -> AppResult<Vec<Permission>> {
        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT id, name, resource_type, action, scope, conditions, is_active
            FROM rbac_permissions
            ORDER BY name
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list permissions: {error}")))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    pub(super) async fn attach_permission_to_role_impl(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        sqlx::query(
            r#"
            INSERT INTO rbac_role_permissions (role_id, permission_id)
            VALUES ($1, $2)
            ON CONFLICT (role_id, permission_id) DO NOTHING
            "#,
        )
        .bind(role_id.as_uuid())
        .bind(permission_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to attach permission: {error}")))?;

        Ok(())
    }

    pub(super) async fn list_permissions_for_roles_impl(
        &self,
        role_ids: &[RoleId],
    ) -> AppResult<Vec<Permission>> {
        let ids: Vec<uuid::Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT DISTINCT
                permissions.id,
                permissions.name,
                permissions.resource_type,
                permissions.action,
                permissions.scope,
                permissions.conditions,
                permissions.is_active
            FROM rbac_permissions AS permissions
            INNER JOIN rbac_role_permissions AS role_permissions
                ON role_permissions.permission_id = permissions.id
            WHERE role_permissions.role_id = ANY($1)
                AND permissions.is_active
            "#,
        )
        .bind(&ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list role permissions: {error}")))?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }

    pub(super) async fn list_candidate_permissions_impl(
        &self,
        role_ids: &[RoleId],
        resource_type: &str,
        action: &str,
    ) -> AppResult<Vec<Permission>> {
        let ids: Vec<uuid::Uuid> = role_ids.iter().map(RoleId::as_uuid).collect();

        let rows = sqlx::query_as::<_, PermissionRow>(
            r#"
            SELECT DISTINCT
                permissions.id,
                permissions.name,
                permissions.resource_type,
                permissions.action,
                permissions.scope,
                permissions.conditions,
                permissions.is_active
            FROM rbac_permissions AS permissions
            INNER JOIN rbac_role_permissions AS role_permissions
                ON role_permissions.permission_id = permissions.id
            WHERE role_permissions.role_id = ANY($1)
                AND permissions.resource_type = $2
                AND permissions.action = $3
                AND permissions.is_active
            ORDER BY permissions.name
            "#,
        )
        .bind(&ids)
        .bind(resource_type)
        .bind(action)
        .fetch_all(&self.pool)
        .await
        .map_err(|error| {
            AppError::Storage(format!("failed to list candidate permissions: {error}"))
        })?;

        rows.into_iter().map(PermissionRow::into_permission).collect()
    }
}
