use std::collections::BTreeSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use clavis_core::{AppError, AppResult};
use clavis_domain::{
    AuditAction, GrantId, ResourceAccessGrant, RoleId, UserId, UserRoleAssignment,
};

use crate::rbac_ports::{
    AssignRoleOutcome, AuditEvent, AuditSink, RbacRepository, UserRoleBinding,
};


/// Application service for the assignment and grant lifecycle.
///
/// Every successful mutation emits exactly one audit event; failed calls
/// emit none, so caller mistakes never pollute the audit trail.
#[derive(Clone)]
pub struct AssignmentService {
    repository: Arc<dyn RbacRepository>,
    audit: Arc<dyn AuditSink>,
}

impl AssignmentService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn RbacRepository>, audit: Arc<dyn AuditSink>) -> Self {
        Self { repository, audit }
    }

    /// Assigns a role to a user.
    ///
    /// Re-assigning a role the user already holds returns
    /// `created = false` instead of an error or a duplicate row. A role at
    /// its `max_users` cap fails `AssignmentLimitExceeded`.
    pub async fn assign_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        assigned_by: UserId,
        expires_at: Option<DateTime<Utc>>,
        reason: Option<&str>,
    ) -> AppResult<AssignRoleOutcome> {
        let now = Utc::now();

        let role = self
            .repository
            .find_role(role_id)
            .await?
            .filter(|role| role.is_live(now))
            .ok_or_else(|| {
                AppError::RoleNotFound(format!("role '{role_id}' is missing or inactive"))
            })?;

        if let Some(existing) = self.repository.find_active_assignment(user_id, role_id).await? {
            if existing.is_live(now) {
                return Ok(AssignRoleOutcome { created: false });
            }
            // Expired but not yet swept: the row no longer grants anything,
            // replace it instead of treating it as a duplicate.
            self.repository.deactivate_assignment(user_id, role_id).await?;
        }

        if let Some(max_users) = role.max_users {
            let active = self
                .repository
                .count_active_assignments_for_role(role_id)
                .await?;
            if active >= u64::from(max_users) {
                return Err(AppError::AssignmentLimitExceeded {
                    role: role.name.as_str().to_owned(),
                    max_users,
                });
            }
        }

        let assignment = UserRoleAssignment::new(user_id, role_id, assigned_by, now, expires_at);
        let created = self.repository.insert_assignment(assignment).await?;

        if created {
            self.emit_audit(AuditEvent {
                actor: Some(assigned_by),
                action: AuditAction::RoleAssigned,
                resource_type: "rbac_assignment".to_owned(),
                resource_id: format!("{user_id}:{role_id}"),
                detail: Some(assign_detail(&role.name, expires_at, reason)),
            })
            .await;
        }

        Ok(AssignRoleOutcome { created })
    }

    /// Revokes a user's role; fails `NotFound` when no active assignment
    /// exists.
    pub async fn revoke_role(
        &self,
        user_id: UserId,
        role_id: RoleId,
        revoked_by: UserId,
    ) -> AppResult<()> {
        let revoked = self.repository.deactivate_assignment(user_id, role_id).await?;

        if !revoked {
            return Err(AppError::NotFound(format!(
                "no active assignment of role '{role_id}' for user '{user_id}'"
            )));
        }

        self.emit_audit(AuditEvent {
            actor: Some(revoked_by),
            action: AuditAction::RoleRevoked,
            resource_type: "rbac_assignment".to_owned(),
            resource_id: format!("{user_id}:{role_id}"),
            detail: None,
        })
        .await;

        Ok(())
    }

    /// Issues or replaces a per-resource grant. An existing grant's action
    /// set is replaced, never extended with a second row.
    pub async fn grant_resource_access(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
        actions: BTreeSet<String>,
        granted_by: UserId,
        expires_at: Option<DateTime<Utc>>,
    ) -> AppResult<ResourceAccessGrant> {
        if resource_type.trim().is_empty() || resource_id.trim().is_empty() {
            return Err(AppError::Validation(
                "grant resource_type and resource_id must not be empty".to_owned(),
            ));
        }

        if actions.is_empty() || actions.iter().any(|action| action.trim().is_empty()) {
            return Err(AppError::Validation(
                "grant actions must be a non-empty set of non-blank names".to_owned(),
            ));
        }

        let grant = ResourceAccessGrant {
            id: GrantId::new(),
            user_id,
            resource_type: resource_type.to_owned(),
            resource_id: resource_id.to_owned(),
            actions,
            granted_by,
            granted_at: Utc::now(),
            expires_at,
            is_active: true,
        };

        self.repository.upsert_resource_grant(grant.clone()).await?;

        self.emit_audit(AuditEvent {
            actor: Some(granted_by),
            action: AuditAction::ResourceAccessGranted,
            resource_type: grant.resource_type.clone(),
            resource_id: grant.resource_id.clone(),
            detail: Some(format!(
                "granted [{}] on {}/{} to user '{user_id}'",
                grant
                    .actions
                    .iter()
                    .map(String::as_str)
                    .collect::<Vec<_>>()
                    .join(", "),
                grant.resource_type,
                grant.resource_id
            )),
        })
        .await;

        Ok(grant)
    }

    /// Revokes a per-resource grant; fails `NotFound` when none is active.
    pub async fn revoke_resource_access(
        &self,
        user_id: UserId,
        resource_type: &str,
        resource_id: &str,
        revoked_by: UserId,
    ) -> AppResult<()> {
        let revoked = self
            .repository
            .deactivate_resource_grant(user_id, resource_type, resource_id)
            .await?;

        if !revoked {
            return Err(AppError::NotFound(format!(
                "no active grant on {resource_type}/{resource_id} for user '{user_id}'"
            )));
        }

        self.emit_audit(AuditEvent {
            actor: Some(revoked_by),
            action: AuditAction::ResourceAccessRevoked,
            resource_type: resource_type.to_owned(),
            resource_id: resource_id.to_owned(),
            detail: Some(format!("revoked grant for user '{user_id}'")),
        })
        .await;

        Ok(())
    }

    /// Returns the user's live roles with their backing assignments,
    /// ordered by role priority, then name.
    pub async fn list_user_roles(&self, user_id: UserId) -> AppResult<Vec<UserRoleBinding>> {
        let now = Utc::now();
        let assignments = self
            .repository
            .list_active_assignments_for_user(user_id)
            .await?;

        let mut bindings = Vec::new();
        for assignment in assignments {
            if !assignment.is_live(now) {
                continue;
            }
            if let Some(role) = self.repository.find_role(assignment.role_id).await? {
                bindings.push(UserRoleBinding { role, assignment });
            }
        }

        bindings.sort_by(|left, right| {
            right
                .role
                .priority
                .cmp(&left.role.priority)
                .then_with(|| left.role.name.as_str().cmp(right.role.name.as_str()))
        });

        Ok(bindings)
    }

    async fn emit_audit(&self, event: AuditEvent) {
        if let Err(error) = self.audit.emit(event).await {
            tracing::warn!(error = %error, "audit emission failed");
        }
    }
}

fn assign_detail(
    role_name: &clavis_core::NonEmptyString,
    expires_at: Option<DateTime<Utc>>,
    reason: Option<&str>,
) -> String {
    let mut detail = format!("assigned role '{}'", role_name.as_str());
    if let Some(expires_at) = expires_at {
        detail.push_str(&format!(" until {}", expires_at.to_rfc3339()));
    }
    if let Some(reason) = reason {
        detail.push_str(&format!(" ({reason})"));
    }
    detail
}
