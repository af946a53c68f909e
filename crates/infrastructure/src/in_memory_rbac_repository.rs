use std::collections::{HashMap, HashSet, VecDeque};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use clavis_application::{RbacRepository, SweepOutcome};
use clavis_core::{AppError, AppResult};
use clavis_domain::{
    Permission, PermissionId, ResourceAccessGrant, Role, RoleHierarchyEdge, RoleId, UserId,
    UserRoleAssignment,
};

#[cfg(test)]
mod tests;

/// In-memory entity store for tests and single-process deployments.
#[derive(Default)]
pub struct InMemoryRbacRepository {
    roles: RwLock<HashMap<RoleId, Role>>,
    permissions: RwLock<HashMap<PermissionId, Permission>>,
    role_permissions: RwLock<HashSet<(RoleId, PermissionId)>>,
    hierarchy_edges: RwLock<HashSet<(RoleId, RoleId)>>,
    assignments: RwLock<Vec<UserRoleAssignment>>,
    grants: RwLock<Vec<ResourceAccessGrant>>,
}

impl InMemoryRbacRepository {
    /// Creates an empty in-memory repository.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }
}

fn ancestor_reachable(
    edges: &HashSet<(RoleId, RoleId)>,
    start: RoleId,
    target: RoleId,
) -> bool {
    let mut visited = HashSet::from([start]);
    let mut queue = VecDeque::from([start]);

    while let Some(current) = queue.pop_front() {
        if current == target {
            return true;
        }
        for (parent, child) in edges {
            if *child == current && visited.insert(*parent) {
                queue.push_back(*parent);
            }
        }
    }

    false
}

#[async_trait]
impl RbacRepository for InMemoryRbacRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut roles = self.roles.write().await;

        if roles.values().any(|existing| existing.name == role.name) {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name.as_str()
            )));
        }

        roles.insert(role.id, role);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        Ok(self.roles.read().await.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        Ok(self
            .roles
            .read()
            .await
            .values()
            .find(|role| role.name.as_str() == name)
            .cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        Ok(self.roles.read().await.values().cloned().collect())
    }

    async fn set_role_active(&self, role_id: RoleId, is_active: bool) -> AppResult<()> {
        let mut roles = self.roles.write().await;
        let role = roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        role.is_active = is_active;
        Ok(())
    }

    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        let mut permissions = self.permissions.write().await;

        if permissions
            .values()
            .any(|existing| existing.name == permission.name)
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name.as_str()
            )));
        }

        permissions.insert(permission.id, permission);
        Ok(())
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        Ok(self.permissions.read().await.get(&permission_id).cloned())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        Ok(self.permissions.read().await.values().cloned().collect())
    }

    async fn attach_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.role_permissions
            .write()
            .await
            .insert((role_id, permission_id));
        Ok(())
    }

    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>> {
        let role_permissions = self.role_permissions.read().await;
        let permissions = self.permissions.read().await;

        let mut seen = HashSet::new();
        let mut listed = Vec::new();

        for (role_id, permission_id) in role_permissions.iter() {
            if role_ids.contains(role_id)
                && seen.insert(*permission_id)
                && let Some(permission) = permissions.get(permission_id)
                && permission.is_active
            {
                listed.push(permission.clone());
            }
        }

        Ok(listed)
    }

    async fn list_candidate_permissions(
        &self,
        role_ids: &[RoleId],
        resource_type: &str,
        action: &str,
    ) -> AppResult<Vec<Permission>> {
        Ok(self
            .list_permissions_for_roles(role_ids)
            .await?
            .into_iter()
            .filter(|permission| permission.matches(resource_type, action))
            .collect())
    }

    async fn parents_of(&self, role_id: RoleId) -> AppResult<Vec<RoleId>> {
        Ok(self
            .hierarchy_edges
            .read()
            .await
            .iter()
            .filter_map(|(parent, child)| (*child == role_id).then_some(*parent))
            .collect())
    }

    async fn add_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<()> {
        // The reachability check runs under the same write lock as the
        // insert, so two concurrent adds cannot jointly close a loop.
        let mut edges = self.hierarchy_edges.write().await;

        if ancestor_reachable(&edges, parent_role_id, child_role_id) {
            return Err(AppError::CycleDetected(format!(
                "edge '{parent_role_id}:{child_role_id}' would create a cycle"
            )));
        }

        edges.insert((parent_role_id, child_role_id));
        Ok(())
    }

    async fn remove_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<bool> {
        Ok(self
            .hierarchy_edges
            .write()
            .await
            .remove(&(parent_role_id, child_role_id)))
    }

    async fn list_hierarchy_edges(&self) -> AppResult<Vec<RoleHierarchyEdge>> {
        Ok(self
            .hierarchy_edges
            .read()
            .await
            .iter()
            .map(|(parent, child)| RoleHierarchyEdge {
                parent_role_id: *parent,
                child_role_id: *child,
            })
            .collect())
    }

    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<bool> {
        let mut assignments = self.assignments.write().await;

        let duplicate = assignments.iter().any(|existing| {
            existing.is_active
                && existing.user_id == assignment.user_id
                && existing.role_id == assignment.role_id
        });
        if duplicate {
            return Ok(false);
        }

        assignments.push(assignment);
        Ok(true)
    }

    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .find(|assignment| {
                assignment.is_active
                    && assignment.user_id == user_id
                    && assignment.role_id == role_id
            })
            .cloned())
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|assignment| assignment.is_active && assignment.role_id == role_id)
            .count() as u64)
    }

    async fn deactivate_assignment(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let mut assignments = self.assignments.write().await;
        let mut deactivated = false;

        for assignment in assignments.iter_mut() {
            if assignment.is_active
                && assignment.user_id == user_id
                && assignment.role_id == role_id
            {
                assignment.is_active = false;
                deactivated = true;
            }
        }

        Ok(deactivated)
    }

    async fn list_active_assignments_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<UserRoleAssignment>> {
        Ok(self
            .assignments
            .read()
            .await
            .iter()
            .filter(|assignment| assignment.is_active && assignment.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_resource_grant(&self, grant: ResourceAccessGrant) -> AppResult<()> {
        let mut grants = self.grants.write().await;

        grants.retain(|existing| {
            !(existing.user_id == grant.user_id
                && existing.resource_type == grant.resource_type
                && existing.resource_id == grant.resource_id)
        });
        grants.push(grant);

        Ok(())
    }

    async fn find_active_resource_grant(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<Option<ResourceAccessGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .find(|grant| {
                grant.is_active
                    && grant.user_id == user_id
                    && grant.resource_type == resource_type
                    && grant.resource_id == resource_id
            })
            .cloned())
    }

    async fn deactivate_resource_grant(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<bool> {
        let mut grants = self.grants.write().await;
        let mut deactivated = false;

        for grant in grants.iter_mut() {
            if grant.is_active
                && grant.user_id == user_id
                && grant.resource_type == resource_type
                && grant.resource_id == resource_id
            {
                grant.is_active = false;
                deactivated = true;
            }
        }

        Ok(deactivated)
    }

    async fn list_active_grants_for_user(
        &self,
        user_id: UserId,
    ) -> AppResult<Vec<ResourceAccessGrant>> {
        Ok(self
            .grants
            .read()
            .await
            .iter()
            .filter(|grant| grant.is_active && grant.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        let mut outcome = SweepOutcome::default();

        let mut assignments = self.assignments.write().await;
        for assignment in assignments.iter_mut() {
            if assignment.is_active && assignment.expires_at.is_some_and(|at| at < now) {
                assignment.is_active = false;
                outcome.assignments_deactivated += 1;
            }
        }
        drop(assignments);

        let mut grants = self.grants.write().await;
        for grant in grants.iter_mut() {
            if grant.is_active && grant.expires_at.is_some_and(|at| at < now) {
                grant.is_active = false;
                outcome.grants_deactivated += 1;
            }
        }

        Ok(outcome)
    }
}
