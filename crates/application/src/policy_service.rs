use std::collections::HashSet;
use std::sync::Arc;

use chrono::{DateTime, Utc};

use clavis_core::AppResult;
use clavis_domain::{
    AuditAction, CheckContext, Permission, PermissionScope, RoleId, UserId,
};

use crate::hierarchy_service::HierarchyService;
use crate::rbac_ports::{
    AuditEvent, AuditSink, DecisionCache, DecisionKey, MembershipProvider, RbacRepository,
};


/// Actions whose denial is reported to the audit collaborator.
const HIGH_RISK_ACTIONS: &[&str] = &["delete", "manage", "admin"];

/// One authorization question.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckRequest {
    /// Requesting user (already authenticated upstream).
    pub user_id: UserId,
    /// Resource type label, e.g. `document`.
    pub resource_type: String,
    /// Action label, e.g. `read`.
    pub action: String,
    /// Concrete resource instance; required for grant fallback.
    pub resource_id: Option<String>,
    /// Request context for `own` scope and conditions. Callers that omit it
    /// are trusted to have filtered to the user's own resources upstream.
    pub context: Option<CheckContext>,
}

/// The decision engine: resolves a request to a plain allow/deny.
#[derive(Clone)]
pub struct PolicyService {
    repository: Arc<dyn RbacRepository>,
    hierarchy: HierarchyService,
    membership: Arc<dyn MembershipProvider>,
    audit: Arc<dyn AuditSink>,
    cache: Option<Arc<dyn DecisionCache>>,
}

impl PolicyService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(
        repository: Arc<dyn RbacRepository>,
        hierarchy: HierarchyService,
        membership: Arc<dyn MembershipProvider>,
        audit: Arc<dyn AuditSink>,
    ) -> Self {
        Self {
            repository,
            hierarchy,
            membership,
            audit,
            cache: None,
        }
    }

    /// Adds a short-TTL decision cache in front of full evaluation.
    ///
    /// Only context-free requests are cached: the cache key cannot capture
    /// ownership or client-address context, so caching those decisions
    /// could replay a context-specific answer for a different context.
    #[must_use]
    pub fn with_cache(mut self, cache: Arc<dyn DecisionCache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Decides whether the user may perform the action.
    ///
    /// The answer is always a plain boolean: "denied" is the expected
    /// negative outcome, and an entity-store failure during evaluation
    /// converts to deny (fail-closed) rather than surfacing as an error.
    pub async fn check_permission(&self, request: &CheckRequest) -> bool {
        let cacheable = request.context.is_none();

        if cacheable
            && let Some(cache) = &self.cache
            && let Ok(Some(cached)) = cache.get(&decision_key(request)).await
        {
            return cached;
        }

        let allowed = match self.evaluate(request).await {
            Ok(allowed) => allowed,
            Err(error) => {
                tracing::warn!(
                    user_id = %request.user_id,
                    resource_type = %request.resource_type,
                    action = %request.action,
                    error = %error,
                    "permission check failed; denying"
                );
                false
            }
        };

        if cacheable && let Some(cache) = &self.cache {
            if let Err(error) = cache.put(decision_key(request), allowed).await {
                tracing::warn!(error = %error, "decision cache write failed");
            }
        }

        if !allowed && HIGH_RISK_ACTIONS.contains(&request.action.as_str()) {
            self.emit_denial(request).await;
        }

        allowed
    }

    /// Returns the deduplicated permissions attached to the user's
    /// effective role set (assigned roles plus all their ancestors).
    pub async fn list_user_permissions(&self, user_id: UserId) -> AppResult<Vec<Permission>> {
        let now = Utc::now();
        let effective = self.effective_role_set(user_id, now).await?;
        let role_ids: Vec<RoleId> = effective.into_iter().collect();

        let mut permissions = self.repository.list_permissions_for_roles(&role_ids).await?;
        permissions.sort_by(|left, right| left.name.as_str().cmp(right.name.as_str()));
        Ok(permissions)
    }

    async fn evaluate(&self, request: &CheckRequest) -> AppResult<bool> {
        let now = Utc::now();

        let effective = self.effective_role_set(request.user_id, now).await?;

        if !effective.is_empty() {
            let role_ids: Vec<RoleId> = effective.into_iter().collect();
            let candidates = self
                .repository
                .list_candidate_permissions(&role_ids, &request.resource_type, &request.action)
                .await?;

            // First match allows; evaluation is purely additive, so there is
            // no "better" permission to keep scanning for.
            for permission in candidates {
                if self.scope_satisfied(&permission, request).await
                    && conditions_satisfied(&permission, request.context.as_ref(), now)
                {
                    return Ok(true);
                }
            }
        }

        if let Some(resource_id) = &request.resource_id
            && let Some(grant) = self
                .repository
                .find_active_resource_grant(request.user_id, &request.resource_type, resource_id)
                .await?
            && grant.is_live(now)
            && grant.allows(&request.action)
        {
            return Ok(true);
        }

        Ok(false)
    }

    /// Unions each live assigned role with its ancestors. Roles that are
    /// disabled or past their own expiry contribute nothing.
    async fn effective_role_set(
        &self,
        user_id: UserId,
        now: DateTime<Utc>,
    ) -> AppResult<HashSet<RoleId>> {
        let assignments = self
            .repository
            .list_active_assignments_for_user(user_id)
            .await?;

        let mut effective = HashSet::new();

        for assignment in assignments {
            if !assignment.is_live(now) {
                continue;
            }

            if !self.role_is_live(assignment.role_id, now).await? {
                continue;
            }

            if effective.insert(assignment.role_id) {
                for ancestor in self.hierarchy.ancestors_of(assignment.role_id).await? {
                    if !effective.contains(&ancestor)
                        && self.role_is_live(ancestor, now).await?
                    {
                        effective.insert(ancestor);
                    }
                }
            }
        }

        Ok(effective)
    }

    async fn role_is_live(&self, role_id: RoleId, now: DateTime<Utc>) -> AppResult<bool> {
        Ok(self
            .repository
            .find_role(role_id)
            .await?
            .is_some_and(|role| role.is_live(now)))
    }

    async fn scope_satisfied(&self, permission: &Permission, request: &CheckRequest) -> bool {
        match permission.scope {
            PermissionScope::Global => true,
            PermissionScope::Own => match request.context.as_ref().and_then(|ctx| ctx.owner_id) {
                Some(owner_id) => owner_id == request.user_id,
                // No ownership context supplied: the caller is trusted to
                // have filtered to the user's own resources upstream.
                None => true,
            },
            PermissionScope::Team | PermissionScope::Organization => {
                let context = request.context.clone().unwrap_or_default();
                match self
                    .membership
                    .is_member(request.user_id, permission.scope, &context)
                    .await
                {
                    Ok(is_member) => is_member,
                    Err(error) => {
                        tracing::warn!(
                            user_id = %request.user_id,
                            scope = permission.scope.as_str(),
                            error = %error,
                            "membership lookup failed; treating as non-member"
                        );
                        false
                    }
                }
            }
        }
    }

    async fn emit_denial(&self, request: &CheckRequest) {
        let event = AuditEvent {
            actor: Some(request.user_id),
            action: AuditAction::AccessDenied,
            resource_type: request.resource_type.clone(),
            resource_id: request.resource_id.clone().unwrap_or_default(),
            detail: Some(format!(
                "denied high-risk action '{}' for user '{}'",
                request.action, request.user_id
            )),
        };

        if let Err(error) = self.audit.emit(event).await {
            tracing::warn!(error = %error, "audit emission failed");
        }
    }
}

fn conditions_satisfied(
    permission: &Permission,
    context: Option<&CheckContext>,
    now: DateTime<Utc>,
) -> bool {
    permission
        .conditions
        .iter()
        .all(|condition| condition.evaluate(context, now))
}

fn decision_key(request: &CheckRequest) -> DecisionKey {
    DecisionKey {
        user_id: request.user_id,
        resource_type: request.resource_type.clone(),
        action: request.action.clone(),
        resource_id: request.resource_id.clone(),
    }
}
