use std::sync::Arc;

use clavis_core::{AppError, AppResult};
use clavis_domain::{
    AuditAction, Permission, PermissionId, PermissionInput, Role, RoleId, RoleInput, UserId,
};

use crate::rbac_ports::{AuditEvent, AuditSink, RbacRepository};

/// Application service for role and permission definition.
///
/// Definitions are created by administrators and soft-disabled rather than
/// deleted, so assignment rows never dangle.
#[derive(Clone)]
pub struct CatalogService {
    repository: Arc<dyn RbacRepository>,
    audit: Arc<dyn AuditSink>,
}

impl CatalogService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn RbacRepository>, audit: Arc<dyn AuditSink>) -> Self {
        Self { repository, audit }
    }

    /// Creates a role and emits an audit event.
    pub async fn create_role(&self, input: RoleInput, actor: UserId) -> AppResult<Role> {
        let role = Role::new(input)?;
        self.repository.insert_role(role.clone()).await?;

        self.emit_audit(AuditEvent {
            actor: Some(actor),
            action: AuditAction::RoleCreated,
            resource_type: "rbac_role".to_owned(),
            resource_id: role.id.to_string(),
            detail: Some(format!("created role '{}'", role.name.as_str())),
        })
        .await;

        Ok(role)
    }

    /// Soft-disables a role. System roles cannot be disabled.
    pub async fn disable_role(&self, role_id: RoleId, actor: UserId) -> AppResult<()> {
        let role = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::RoleNotFound(format!("role '{role_id}' was not found")))?;

        if role.is_system {
            return Err(AppError::Validation(format!(
                "system role '{}' cannot be disabled",
                role.name.as_str()
            )));
        }

        self.repository.set_role_active(role_id, false).await?;

        self.emit_audit(AuditEvent {
            actor: Some(actor),
            action: AuditAction::RoleDisabled,
            resource_type: "rbac_role".to_owned(),
            resource_id: role_id.to_string(),
            detail: Some(format!("disabled role '{}'", role.name.as_str())),
        })
        .await;

        Ok(())
    }

    /// Creates a permission and emits an audit event.
    pub async fn create_permission(
        &self,
        input: PermissionInput,
        actor: UserId,
    ) -> AppResult<Permission> {
        let permission = Permission::new(input)?;
        self.repository.insert_permission(permission.clone()).await?;

        self.emit_audit(AuditEvent {
            actor: Some(actor),
            action: AuditAction::PermissionCreated,
            resource_type: "rbac_permission".to_owned(),
            resource_id: permission.id.to_string(),
            detail: Some(format!(
                "created permission '{}' ({} {} {})",
                permission.name.as_str(),
                permission.resource_type,
                permission.action,
                permission.scope.as_str()
            )),
        })
        .await;

        Ok(permission)
    }

    /// Attaches a permission to a role; attaching twice is a no-op.
    pub async fn attach_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
        actor: UserId,
    ) -> AppResult<()> {
        let role = self
            .repository
            .find_role(role_id)
            .await?
            .ok_or_else(|| AppError::RoleNotFound(format!("role '{role_id}' was not found")))?;

        let permission = self
            .repository
            .find_permission(permission_id)
            .await?
            .ok_or_else(|| {
                AppError::PermissionNotFound(format!("permission '{permission_id}' was not found"))
            })?;

        self.repository
            .attach_permission_to_role(role_id, permission_id)
            .await?;

        self.emit_audit(AuditEvent {
            actor: Some(actor),
            action: AuditAction::RolePermissionAttached,
            resource_type: "rbac_role_permission".to_owned(),
            resource_id: format!("{role_id}:{permission_id}"),
            detail: Some(format!(
                "attached permission '{}' to role '{}'",
                permission.name.as_str(),
                role.name.as_str()
            )),
        })
        .await;

        Ok(())
    }

    /// Lists all roles ordered by priority, then name.
    pub async fn list_roles(&self) -> AppResult<Vec<Role>> {
        let mut roles = self.repository.list_roles().await?;
        roles.sort_by(|left, right| {
            right
                .priority
                .cmp(&left.priority)
                .then_with(|| left.name.as_str().cmp(right.name.as_str()))
        });
        Ok(roles)
    }

    /// Lists all permissions ordered by name.
    pub async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        let mut permissions = self.repository.list_permissions().await?;
        permissions.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));
        Ok(permissions)
    }

    async fn emit_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.emit(event).await {
            tracing::warn!(error = %error, "audit emission failed");
        }
    }
}
