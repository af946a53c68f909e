//! Shared in-memory fakes for service tests.

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::Mutex;

use clavis_core::{AppError, AppResult};
use clavis_domain::{
    CheckContext, Permission, PermissionId, PermissionScope, ResourceAccessGrant, Role,
    RoleHierarchyEdge, RoleId, UserId, UserRoleAssignment,
};

use crate::rbac_ports::{
    AuditEvent, AuditSink, DecisionCache, DecisionKey, MembershipProvider, RbacRepository,
    SweepOutcome,
};

#[derive(Default)]
pub struct FakeState {
    pub roles: HashMap<RoleId, Role>,
    pub permissions: HashMap<PermissionId, Permission>,
    pub role_permissions: HashSet<(RoleId, PermissionId)>,
    pub edges: HashSet<(RoleId, RoleId)>,
    pub assignments: Vec<UserRoleAssignment>,
    pub grants: Vec<ResourceAccessGrant>,
}

/// In-memory repository fake with read-failure injection for fail-closed
/// tests.
#[derive(Default)]
pub struct FakeRbacRepository {
    pub state: Mutex<FakeState>,
    pub fail_reads: AtomicBool,
}

impl FakeRbacRepository {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_reads(&self) {
        self.fail_reads.store(true, Ordering::SeqCst);
    }

    fn check_reads(&self) -> AppResult<()> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(AppError::Storage("injected read failure".to_owned()));
        }
        Ok(())
    }

    /// Inserts a raw assignment row, bypassing the uniqueness check. Used to
    /// model rows the sweeper has not yet visited.
    pub async fn insert_assignment_row(&self, assignment: UserRoleAssignment) {
        self.state.lock().await.assignments.push(assignment);
    }

    pub async fn seed_role(&self, role: Role) {
        self.state.lock().await.roles.insert(role.id, role);
    }

    pub async fn seed_permission_on_role(&self, role_id: RoleId, permission: Permission) {
        let mut state = self.state.lock().await;
        state.role_permissions.insert((role_id, permission.id));
        state.permissions.insert(permission.id, permission);
    }

    fn reachable_from(state: &FakeState, start: RoleId, target: RoleId) -> bool {
        let mut visited = HashSet::from([start]);
        let mut queue = VecDeque::from([start]);

        while let Some(current) = queue.pop_front() {
            if current == target {
                return true;
            }
            for (parent, child) in &state.edges {
                if *child == current && visited.insert(*parent) {
                    queue.push_back(*parent);
                }
            }
        }

        false
    }
}

#[async_trait]
impl RbacRepository for FakeRbacRepository {
    async fn insert_role(&self, role: Role) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .roles
            .values()
            .any(|existing| existing.name == role.name)
        {
            return Err(AppError::Conflict(format!(
                "role '{}' already exists",
                role.name.as_str()
            )));
        }
        state.roles.insert(role.id, role);
        Ok(())
    }

    async fn find_role(&self, role_id: RoleId) -> AppResult<Option<Role>> {
        self.check_reads()?;
        Ok(self.state.lock().await.roles.get(&role_id).cloned())
    }

    async fn find_role_by_name(&self, name: &str) -> AppResult<Option<Role>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .roles
            .values()
            .find(|role| role.name.as_str() == name)
            .cloned())
    }

    async fn list_roles(&self) -> AppResult<Vec<Role>> {
        self.check_reads()?;
        Ok(self.state.lock().await.roles.values().cloned().collect())
    }

    async fn set_role_active(&self, role_id: RoleId, is_active: bool) -> AppResult<()> {
        let mut state = self.state.lock().await;
        let role = state
            .roles
            .get_mut(&role_id)
            .ok_or_else(|| AppError::NotFound(format!("role '{role_id}' was not found")))?;
        role.is_active = is_active;
        Ok(())
    }

    async fn insert_permission(&self, permission: Permission) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if state
            .permissions
            .values()
            .any(|existing| existing.name == permission.name)
        {
            return Err(AppError::Conflict(format!(
                "permission '{}' already exists",
                permission.name.as_str()
            )));
        }
        state.permissions.insert(permission.id, permission);
        Ok(())
    }

    async fn find_permission(&self, permission_id: PermissionId) -> AppResult<Option<Permission>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .get(&permission_id)
            .cloned())
    }

    async fn list_permissions(&self) -> AppResult<Vec<Permission>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .permissions
            .values()
            .cloned()
            .collect())
    }

    async fn attach_permission_to_role(
        &self,
        role_id: RoleId,
        permission_id: PermissionId,
    ) -> AppResult<()> {
        self.state
            .lock()
            .await
            .role_permissions
            .insert((role_id, permission_id));
        Ok(())
    }

    async fn list_permissions_for_roles(&self, role_ids: &[RoleId]) -> AppResult<Vec<Permission>> {
        self.check_reads()?;
        let state = self.state.lock().await;
        let mut seen = HashSet::new();
        let mut listed = Vec::new();

        for (role_id, permission_id) in &state.role_permissions {
            if role_ids.contains(role_id)
                && seen.insert(*permission_id)
                && let Some(permission) = state.permissions.get(permission_id)
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
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .edges
            .iter()
            .filter_map(|(parent, child)| (*child == role_id).then_some(*parent))
            .collect())
    }

    async fn add_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<()> {
        let mut state = self.state.lock().await;
        if Self::reachable_from(&state, parent_role_id, child_role_id) {
            return Err(AppError::CycleDetected(format!(
                "edge '{parent_role_id}:{child_role_id}' would create a cycle"
            )));
        }
        state.edges.insert((parent_role_id, child_role_id));
        Ok(())
    }

    async fn remove_hierarchy_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<bool> {
        Ok(self
            .state
            .lock()
            .await
            .edges
            .remove(&(parent_role_id, child_role_id)))
    }

    async fn list_hierarchy_edges(&self) -> AppResult<Vec<RoleHierarchyEdge>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .edges
            .iter()
            .map(|(parent, child)| RoleHierarchyEdge {
                parent_role_id: *parent,
                child_role_id: *child,
            })
            .collect())
    }

    async fn insert_assignment(&self, assignment: UserRoleAssignment) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let duplicate = state.assignments.iter().any(|existing| {
            existing.is_active
                && existing.user_id == assignment.user_id
                && existing.role_id == assignment.role_id
        });
        if duplicate {
            return Ok(false);
        }
        state.assignments.push(assignment);
        Ok(true)
    }

    async fn find_active_assignment(
        &self,
        user_id: UserId,
        role_id: RoleId,
    ) -> AppResult<Option<UserRoleAssignment>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .find(|assignment| {
                assignment.is_active
                    && assignment.user_id == user_id
                    && assignment.role_id == role_id
            })
            .cloned())
    }

    async fn count_active_assignments_for_role(&self, role_id: RoleId) -> AppResult<u64> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|assignment| assignment.is_active && assignment.role_id == role_id)
            .count() as u64)
    }

    async fn deactivate_assignment(&self, user_id: UserId, role_id: RoleId) -> AppResult<bool> {
        let mut state = self.state.lock().await;
        let mut deactivated = false;
        for assignment in &mut state.assignments {
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
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .assignments
            .iter()
            .filter(|assignment| assignment.is_active && assignment.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn upsert_resource_grant(&self, grant: ResourceAccessGrant) -> AppResult<()> {
        let mut state = self.state.lock().await;
        state.grants.retain(|existing| {
            !(existing.user_id == grant.user_id
                && existing.resource_type == grant.resource_type
                && existing.resource_id == grant.resource_id)
        });
        state.grants.push(grant);
        Ok(())
    }

    async fn find_active_resource_grant(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
    ) -> AppResult<Option<ResourceAccessGrant>> {
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .grants
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
        let mut state = self.state.lock().await;
        let mut deactivated = false;
        for grant in &mut state.grants {
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
        self.check_reads()?;
        Ok(self
            .state
            .lock()
            .await
            .grants
            .iter()
            .filter(|grant| grant.is_active && grant.user_id == user_id)
            .cloned()
            .collect())
    }

    async fn deactivate_expired(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        let mut state = self.state.lock().await;
        let mut outcome = SweepOutcome::default();

        for assignment in &mut state.assignments {
            if assignment.is_active && assignment.expires_at.is_some_and(|at| at < now) {
                assignment.is_active = false;
                outcome.assignments_deactivated += 1;
            }
        }
        for grant in &mut state.grants {
            if grant.is_active && grant.expires_at.is_some_and(|at| at < now) {
                grant.is_active = false;
                outcome.grants_deactivated += 1;
            }
        }

        Ok(outcome)
    }
}

#[derive(Default)]
pub struct FakeAuditSink {
    pub events: Mutex<Vec<AuditEvent>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl AuditSink for FakeAuditSink {
    async fn emit(&self, event: AuditEvent) -> AppResult<()> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Storage("injected audit failure".to_owned()));
        }
        self.events.lock().await.push(event);
        Ok(())
    }
}

/// Membership fake keyed on `(user, team-or-organization id)`.
#[derive(Default)]
pub struct FakeMembershipProvider {
    pub members: Mutex<HashSet<(UserId, String)>>,
    pub fail: AtomicBool,
}

#[async_trait]
impl MembershipProvider for FakeMembershipProvider {
    async fn is_member(
        &self,
        user_id: UserId,
        scope: PermissionScope,
        context: &CheckContext,
    ) -> AppResult<bool> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(AppError::Storage("injected membership failure".to_owned()));
        }

        let group = match scope {
            PermissionScope::Team => context.team_id.clone(),
            PermissionScope::Organization => context.organization_id.clone(),
            PermissionScope::Own | PermissionScope::Global => None,
        };

        Ok(match group {
            Some(group) => self.members.lock().await.contains(&(user_id, group)),
            None => false,
        })
    }
}

#[derive(Default)]
pub struct FakeDecisionCache {
    pub entries: Mutex<HashMap<DecisionKey, bool>>,
}

#[async_trait]
impl DecisionCache for FakeDecisionCache {
    async fn get(&self, key: &DecisionKey) -> AppResult<Option<bool>> {
        Ok(self.entries.lock().await.get(key).copied())
    }

    async fn put(&self, key: DecisionKey, allowed: bool) -> AppResult<()> {
        self.entries.lock().await.insert(key, allowed);
        Ok(())
    }
}
