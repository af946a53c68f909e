use std::collections::BTreeSet;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};

use clavis_application::{RbacRepository, SweepOutcome};
use clavis_core::{AppError, AppResult, NonEmptyString};
use clavis_domain::{
    AccessCondition, AssignmentId, GrantId, Permission, PermissionId, PermissionScope,
    ResourceAccessGrant, Role, RoleHierarchyEdge, RoleId, UserId, UserRoleAssignment,
};

mod assignments;
mod grants;
mod hierarchy;
mod roles;
mod sweep;

#[cfg(test)]
mod tests;

/// PostgreSQL-backed entity store for the six RBAC entities.
#[derive(Clone)]
pub struct PostgresRbacRepository {
    pool: PgPool,
}

impl PostgresRbacRepository {
    /// Creates a repository with the provided connection pool.
    #[must_use]
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: uuid::Uuid,
    name: String,
    display_name: String,
    priority: i32,
    is_system: bool,
    max_users: Option<i32>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl RoleRow {
    fn into_role(self) -> AppResult<Role> {
        let max_users = self
            .max_users
            .map(u32::try_from)
            .transpose()
            .map_err(|_| {
                AppError::Storage(format!("invalid stored max_users for role '{}'", self.id))
            })?;

        Ok(Role {
            id: RoleId::from_uuid(self.id),
            name: NonEmptyString::new(self.name)?,
            display_name: self.display_name,
            priority: self.priority,
            is_system: self.is_system,
            max_users,
            expires_at: self.expires_at,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct PermissionRow {
    id: uuid::Uuid,
    name: String,
    resource_type: String,
    action: String,
    scope: String,
    conditions: serde_json::Value,
    is_active: bool,
}

impl PermissionRow {
    fn into_permission(self) -> AppResult<Permission> {
        let scope = self.scope.parse::<PermissionScope>()?;
        let conditions: Vec<AccessCondition> = serde_json::from_value(self.conditions)
            .map_err(|error| {
                AppError::Storage(format!(
                    "invalid stored conditions for permission '{}': {error}",
                    self.id
                ))
            })?;

        Ok(Permission {
            id: PermissionId::from_uuid(self.id),
            name: NonEmptyString::new(self.name)?,
            resource_type: self.resource_type,
            action: self.action,
            scope,
            conditions,
            is_active: self.is_active,
        })
    }
}

#[derive(Debug, FromRow)]
struct AssignmentRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    role_id: uuid::Uuid,
    assigned_by: uuid::Uuid,
    assigned_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl AssignmentRow {
    fn into_assignment(self) -> UserRoleAssignment {
        UserRoleAssignment {
            id: AssignmentId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            role_id: RoleId::from_uuid(self.role_id),
            assigned_by: UserId::from_uuid(self.assigned_by),
            assigned_at: self.assigned_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

#[derive(Debug, FromRow)]
struct GrantRow {
    id: uuid::Uuid,
    user_id: uuid::Uuid,
    resource_type: String,
    resource_id: String,
    actions: Vec<String>,
    granted_by: uuid::Uuid,
    granted_at: DateTime<Utc>,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
}

impl GrantRow {
    fn into_grant(self) -> ResourceAccessGrant {
        ResourceAccessGrant {
            id: GrantId::from_uuid(self.id),
            user_id: UserId::from_uuid(self.user_id),
            resource_type: self.resource_type,
            resource_id: self.resource_id,
            actions: self.actions.into_iter().collect::<BTreeSet<_>>(),
            granted_by: UserId::from_uuid(self.granted_by),
            granted_at: self.granted_at,
            expires_at: self.expires_at,
            is_active: self.is_active,
        }
    }
}

fn map_unique_conflict(error: sqlx::Error, conflict: AppError) -> AppError {
    if let sqlx::Error::Database(database_error) = &error
        && database_error.code().as_deref() == Some("23505")
    {
        return conflict;
    }

    AppError::Storage(format!("statement failed: {error}"))
}

#[async_trait]
impl RbacRepository for PostgresRbacRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        self.insert_role_impl(role).await
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        self.find_role_impl(role_id).await
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.find_role_by_name_impl(name).await
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.list_roles_impl().await
    }

    async fn set_role_active(&self, role_id: RoleId, is_active: bool) -> AppResult<()> {
        self.set_role_active_impl(role_id, is_active).await
    }

    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        self.insert_permission_impl(permission).await
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        self.find_permission_impl(permission_id).await
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.list_permissions_impl().await
    }

    async fn attach_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.attach_permission_to_role_impl(role_id, permission_id)
            .await
    }

    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>> {
        self.list_permissions_for_roles_impl(role_ids).await
    }

    async fn list_candidate_permissions(
        &self,
        role_ids: &[RoleId],
        resource_type: &str,
        action: &str,
    ) -> AppResult<Vec<Permission>> {
        self.list_candidate_permissions_impl(role_ids, resource_type, action)
            .await
    }

    async fn parents_of(&self, role_id: RoleId) -> AppResult<Vec<RoleId>> {
        self.parents_of_impl(role_id).await
    }

    async fn add_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<()> {
        self.add_hierarchy_edge_impl(parent_role_id, child_role_id)
            .await
    }

    async fn remove_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<bool> {
        self.remove_hierarchy_edge_impl(parent_role_id, child_role_id)
            .await
    }

    async fn list_hierarchy_edges(&self) -> AppResult<Vec<RoleHierarchyEdge>> {
        self.list_hierarchy_edges_impl().await
    }

    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<bool> {
        self.insert_assignment_impl(assignment).await
    }

    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleAssignment>> {
        self.find_active_assignment_impl(user_id, role_id).await
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        self.count_active_assignments_for_role_impl(role_id).await
    }

    async fn deactivate_assignment(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        self.deactivate_assignment_impl(user_id, role_id).await
    }

    async fn list_active_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        self.list_active_assignments_for_user_impl(user_id).await
    }

    async fn upsert_resource_grant(&self, grant: ResourceAccessGrant) -> AppResult<()> {
        self.upsert_resource_grant_impl(grant).await
    }

    async fn find_active_resource_grant(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<Option<ResourceAccessGrant>> {
        self.find_active_resource_grant_impl(user_id, resource_type, resource_id)
            .await
    }

    async fn deactivate_resource_grant(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<bool> {
        self.deactivate_resource_grant_impl(user_id, resource_type, resource_id)
            .await
    }

    async fn list_active_grants_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<ResourceAccessGrant>> {
        self.list_active_grants_for_user_impl(user_id).await
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        self.deactivate_expired_impl(now).await
    }
}
