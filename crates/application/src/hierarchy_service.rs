use std::collections::{HashSet, VecDeque};
use std::sync::Arc;

use chrono::Utc;

use clavis_core::{AppError, AppResult};
use clavis_domain::{AuditAction, Role, RoleId, UserId};

use crate::rbac_ports::{AuditEvent, AuditSink, RbacRepository};


/// Application service for role-inheritance edges.
#[derive(Clone)]
pub struct HierarchyService {
    repository: Arc<dyn RbacRepository>,
    audit: Arc<dyn AuditSink>,
}

impl HierarchyService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn RbacRepository>, audit: Arc<dyn AuditSink>) -> Self {
        Self { repository, audit }
    }

    /// Returns every role the given role inherits from, excluding itself.
    ///
    /// Traverses parent edges breadth-first with a visited set, so a role
    /// inherited through two paths (diamond inheritance) counts once. A
    /// role reachable from itself is a corrupted graph and fails
    /// `CycleDetected` rather than being silently truncated.
    pub async fn ancestors_of(&self, role_id: RoleId) -> AppResult<HashSet<RoleId>> {
        let mut ancestors = HashSet::new();
        let mut queue = VecDeque::from([role_id]);

        while let Some(current) = queue.pop_front() {
            for parent in self.repository.parents_of(current).await? {
                if parent == role_id {
                    return Err(AppError::CycleDetected(format!(
                        "role '{role_id}' is reachable from itself through the hierarchy"
                    )));
                }

                if ancestors.insert(parent) {
                    queue.push_back(parent);
                }
            }
        }

        Ok(ancestors)
    }

    /// Adds an inheritance edge: `child` inherits `parent`'s permissions.
    ///
    /// Both roles must exist and be active. The repository re-validates
    /// acyclicity atomically with the write, so concurrent edits cannot
    /// jointly form a cycle.
    pub async fn add_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
        actor: UserId,
    ) -> AppResult<()> {
        if parent_role_id == child_role_id {
            return Err(AppError::CycleDetected(format!(
                "role '{parent_role_id}' cannot inherit from itself"
            )));
        }

        let parent = self.require_active_role(parent_role_id).await?;
        let child = self.require_active_role(child_role_id).await?;

        self.repository
            .add_hierarchy_edge(parent_role_id, child_role_id)
            .await?;

        self.emit_audit(AuditEvent {
            actor: Some(actor),
            action: AuditAction::HierarchyEdgeAdded,
            resource_type: "rbac_hierarchy_edge".to_owned(),
            resource_id: format!("{parent_role_id}:{child_role_id}"),
            detail: Some(format!(
                "role '{}' now inherits from '{}'",
                child.name.as_str(),
                parent.name.as_str()
            )),
        })
        .await;

        Ok(())
    }

    /// Removes an inheritance edge.
    pub async fn remove_edge(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
        actor: UserId,
    ) -> AppResult<()> {
        let removed = self
            .repository
            .remove_hierarchy_edge(parent_role_id, child_role_id)
            .await?;

        if !removed {
            return Err(AppError::NotFound(format!(
                "hierarchy edge '{parent_role_id}:{child_role_id}' was not found"
            )));
        }

        self.emit_audit(AuditEvent {
            actor: Some(actor),
            action: AuditAction::HierarchyEdgeRemoved,
            resource_type: "rbac_hierarchy_edge".to_owned(),
            resource_id: format!("{parent_role_id}:{child_role_id}"),
            detail: None,
        })
        .await;

        Ok(())
    }

    async fn require_active_role(&self, role_id: RoleId) -> AppResult<Role> {
        let now = Utc::now();

        self.repository
            .find_role(role_id)
            .await?
            .filter(|role| role.is_live(now))
            .ok_or_else(|| {
                AppError::RoleNotFound(format!("role '{role_id}' is missing or inactive"))
            })
    }

    async fn emit_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.emit(event).await {
            tracing::warn!(error = %error, "audit emission failed");
        }
    }
}
