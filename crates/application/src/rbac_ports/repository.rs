use async_trait::async_trait;
use chrono::{DateTime, Utc};

use clavis_core::AppResult;
use clavis_domain::{
    Permission, PermissionId, ResourceAccessGrant, Role, RoleHierarchyEdge, RoleId,
    UserId, UserRoleAssignment,
};

/// Counts of rows the sweeper deactivated in one pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SweepOutcome {
    /// Expired user-role assignments flipped inactive.
    pub assignments_deactivated: u64,
    /// Expired resource grants flipped inactive.
    pub grants_deactivated: u64,
}

impl SweepOutcome {
    /// Returns the total number of deactivated rows.
    #[must_use]
    pub fn total(&self) -> u64 {
        self.assignments_deactivated + self.grants_deactivated
    }
}

/// Entity store contract for the six RBAC entities.
///
/// This is the only component allowed to touch persistence; every other
/// component is unit-testable against an in-memory implementation. Reads
/// used by the evaluator filter to active rows; expiry is nevertheless
/// re-checked by callers at decision time.
#[async_trait]
pub trait RbacRepository: Send + Sync {
    /// Persists a new role; fails `Conflict` when the name is taken.
    async fn insert_role(&self, role: Role) -> AppResult<()>;

    /// Finds a role by id.
    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>>;

    /// Finds a role by its unique machine name.
    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>>;

    /// Lists all roles, including disabled ones.
    async fn list_roles(&self) -> AppResult<Vec<Role>>;

    /// Flips a role's soft-disable flag; fails `NotFound` for unknown ids.
    async fn set_role_active(&self, role_id: RoleId, is_active: bool) -> AppResult<()>;

    /// Persists a new permission; fails `Conflict` when the name is taken.
    async fn insert_permission(&self, permission: Permission) -> AppResult<()>;

    /// Finds a permission by id.
    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>>;

    /// Lists all permissions, including disabled ones.
    async fn list_permissions(&self) -> AppResult<Vec<Permission>>;

    /// Attaches a permission to a role; attaching twice is a no-op.
    async fn attach_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()>;

    /// Lists active permissions attached directly to any of the roles.
    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>>;

    /// Lists active permissions attached to any of the roles that target
    /// the given resource type and action.
    async fn list_candidate_permissions(
        &self,
        role_ids: &[RoleId],
        resource_type: &str,
        action: &str,
    ) -> AppResult<Vec<Permission>>;

    /// Returns the direct parent roles of a role.
    async fn parents_of(&self, role_id: RoleId) -> AppResult<Vec<RoleId>>;

    /// Inserts a hierarchy edge after re-validating acyclicity.
    ///
    /// The reachability check and the write happen atomically (one lock
    /// section or one transaction) so concurrent edits cannot jointly form
    /// a cycle. Fails `CycleDetected` when the edge would close a loop;
    /// inserting an existing edge is a no-op.
    async fn add_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<()>;

    /// Removes a hierarchy edge; returns whether an edge was removed.
    async fn remove_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<bool>;

    /// Lists every hierarchy edge.
    async fn list_hierarchy_edges(&self) -> AppResult<Vec<RoleHierarchyEdge>>;

    /// Inserts an assignment row unless an active row already exists for
    /// the pair; returns whether a row was inserted. Uniqueness is enforced
    /// at the storage layer so concurrent calls serialize race-free.
    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<bool>;

    /// Finds the active assignment for a `(user, role)` pair.
    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleAssignment>>;

    /// Counts active assignments referencing a role.
    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64>;

    /// Deactivates the active assignment for a pair; returns whether a row
    /// was deactivated.
    async fn deactivate_assignment(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool>;

    /// Lists a user's active assignments.
    async fn list_active_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignment>>;

    /// Inserts or replaces the active grant for the grant's
    /// `(user, resource_type, resource_id)` key.
    async fn upsert_resource_grant(&self, grant: ResourceAccessGrant) -> AppResult<()>;

    /// Finds the active grant for a `(user, resource_type, resource_id)` key.
    async fn find_active_resource_grant(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<Option<ResourceAccessGrant>>;

    /// Deactivates the active grant for a key; returns whether a row was
    /// deactivated.
    async fn deactivate_resource_grant(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<bool>;

    /// Lists a user's active resource grants.
    async fn list_active_grants_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<ResourceAccessGrant>>;

    /// Bulk-deactivates assignments and grants whose expiry has passed.
    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome>;
}
