use std::collections::BTreeSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::user::UserId;

/// Unique identifier for a resource access grant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct GrantId(Uuid);

impl GrantId {
    /// Creates a new random grant identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a grant identifier from an existing UUID value.
    #[must_use]
    pub fn from_uuid(value: Uuid) -> Self {
        Self(value)
    }

    /// Returns the underlying UUID value.
    #[must_use]
    pub fn as_uuid(&self) -> Uuid {
        self.0
    }
}

impl Default for GrantId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for GrantId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Per-instance access override for one user on one concrete resource.
///
/// Grants extend role-based decisions: the evaluator falls back to them when
/// no role permission allowed the request. At most one active grant exists
/// per `(user_id, resource_type, resource_id)`; re-granting replaces the
/// action set instead of adding a second row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ResourceAccessGrant {
    /// Stable grant identifier.
    pub id: GrantId,
    /// User the grant applies to.
    pub user_id: UserId,
    /// Resource type label.
    pub resource_type: String,
    /// Concrete resource instance identifier.
    pub resource_id: String,
    /// Action names the grant allows.
    pub actions: BTreeSet<String>,
    /// Administrator who issued the grant.
    pub granted_by: UserId,
    /// Issue timestamp.
    pub granted_at: DateTime<Utc>,
    /// Optional expiry; checked at decision time regardless of `is_active`.
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft-deactivation flag.
    pub is_active: bool,
}

impl ResourceAccessGrant {
    /// Returns whether the grant is currently in force.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }

    /// Returns whether the grant covers the action.
    #[must_use]
    pub fn allows(&self, action: &str) -> bool {
        self.actions.contains(action)
    }
}
