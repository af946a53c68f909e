use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::role::RoleId;
use crate::user::UserId;

/// Unique identifier for a user-role assignment row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AssignmentId(Uuid);

impl AssignmentId {
    /// Creates a new random assignment identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates an assignment identifier from an existing UUID value.
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

impl Default for AssignmentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for AssignmentId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A user's membership in a role.
///
/// At most one live row exists per `(user_id, role_id)` pair. Rows are
/// created on grant and deactivated on revoke or expiry, never mutated
/// otherwise.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRoleAssignment {
    /// Stable row identifier.
    pub id: AssignmentId,
    /// Assigned user.
    pub user_id: UserId,
    /// Assigned role.
    pub role_id: RoleId,
    /// Administrator who granted the role.
    pub assigned_by: UserId,
    /// Grant timestamp.
    pub assigned_at: DateTime<Utc>,
    /// Optional expiry; expired rows never grant access even while
    /// `is_active` is still true.
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft-deactivation flag flipped on revoke or by the sweeper.
    pub is_active: bool,
}

impl UserRoleAssignment {
    /// Creates an active assignment starting at `assigned_at`.
    #[must_use]
    pub fn new(
        user_id: UserId,
        role_id: RoleId,
        assigned_by: UserId,
        assigned_at: DateTime<Utc>,
        expires_at: Option<DateTime<Utc>>,
    ) -> Self {
        Self {
            id: AssignmentId::new(),
            user_id,
            role_id,
            assigned_by,
            assigned_at,
            expires_at,
            is_active: true,
        }
    }

    /// Returns whether the assignment currently grants its role.
    ///
    /// The expiry re-check here is the source of truth; the sweeper merely
    /// flips `is_active` later as a read-path optimization.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}
