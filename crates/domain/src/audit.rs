use serde::{Deserialize, Serialize};

/// Stable audit actions emitted by the engine's mutating operations and by
/// denied high-risk permission checks.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuditAction {
    /// Emitted when a role is created.
    RoleCreated,
    /// Emitted when a role is soft-disabled.
    RoleDisabled,
    /// Emitted when a permission is created.
    PermissionCreated,
    /// Emitted when a permission is attached to a role.
    RolePermissionAttached,
    /// Emitted when a hierarchy edge is added.
    HierarchyEdgeAdded,
    /// Emitted when a hierarchy edge is removed.
    HierarchyEdgeRemoved,
    /// Emitted when a role is assigned to a user.
    RoleAssigned,
    /// Emitted when a role assignment is revoked.
    RoleRevoked,
    /// Emitted when a per-resource grant is issued or replaced.
    ResourceAccessGranted,
    /// Emitted when a per-resource grant is revoked.
    ResourceAccessRevoked,
    /// Emitted when a high-risk permission check is denied.
    AccessDenied,
}

impl AuditAction {
    /// Returns a stable storage value for this action.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::RoleCreated => "rbac.role.created",
            Self::RoleDisabled => "rbac.role.disabled",
            Self::PermissionCreated => "rbac.permission.created",
            Self::RolePermissionAttached => "rbac.role_permission.attached",
            Self::HierarchyEdgeAdded => "rbac.hierarchy_edge.added",
            Self::HierarchyEdgeRemoved => "rbac.hierarchy_edge.removed",
            Self::RoleAssigned => "rbac.role.assigned",
            Self::RoleRevoked => "rbac.role.revoked",
            Self::ResourceAccessGranted => "rbac.resource_access.granted",
            Self::ResourceAccessRevoked => "rbac.resource_access.revoked",
            Self::AccessDenied => "rbac.access.denied",
        }
    }
}
