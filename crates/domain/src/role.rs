use chrono::{DateTime, Utc};
use clavis_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Unique identifier for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct RoleId(Uuid);

impl RoleId {
    /// Creates a new random role identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a role identifier from an existing UUID value.
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

impl Default for RoleId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for RoleId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// A named bundle of permissions that can be assigned to users.
///
/// `priority` orders roles in administrative views when several roles grant
/// conflicting scopes for the same permission; evaluation itself is purely
/// additive and never consults it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Role {
    /// Stable role identifier.
    pub id: RoleId,
    /// Unique machine name.
    pub name: NonEmptyString,
    /// Human-readable name for administrative views.
    pub display_name: String,
    /// Display ordering hint; higher wins ties in conflict listings.
    pub priority: i32,
    /// Indicates an engine-managed role that cannot be disabled.
    pub is_system: bool,
    /// Optional cap on concurrently active assignments.
    pub max_users: Option<u32>,
    /// Optional expiry after which the role stops granting anything.
    pub expires_at: Option<DateTime<Utc>>,
    /// Soft-disable flag; disabled roles are never hard-deleted while
    /// assignments still reference them.
    pub is_active: bool,
}

/// Input payload for creating a role.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoleInput {
    /// Unique machine name.
    pub name: String,
    /// Optional display name; defaults to the machine name.
    pub display_name: Option<String>,
    /// Display ordering hint.
    pub priority: i32,
    /// Marks an engine-managed role.
    pub is_system: bool,
    /// Optional active-assignment cap.
    pub max_users: Option<u32>,
    /// Optional role expiry.
    pub expires_at: Option<DateTime<Utc>>,
}

impl Role {
    /// Creates a validated role with a fresh identifier.
    pub fn new(input: RoleInput) -> AppResult<Self> {
        let name = NonEmptyString::new(input.name)?;

        if input.max_users == Some(0) {
            return Err(AppError::Validation(
                "role max_users must be greater than zero when set".to_owned(),
            ));
        }

        let display_name = input
            .display_name
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| name.as_str().to_owned());

        Ok(Self {
            id: RoleId::new(),
            name,
            display_name,
            priority: input.priority,
            is_system: input.is_system,
            max_users: input.max_users,
            expires_at: input.expires_at,
            is_active: true,
        })
    }

    /// Returns whether the role currently grants anything.
    #[must_use]
    pub fn is_live(&self, now: DateTime<Utc>) -> bool {
        self.is_active && self.expires_at.is_none_or(|expires_at| expires_at > now)
    }
}

/// Directed inheritance edge: the child role inherits every permission of
/// the parent role. The edge set must remain a DAG.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct RoleHierarchyEdge {
    /// Role whose permissions are inherited.
    pub parent_role_id: RoleId,
    /// Role that inherits.
    pub child_role_id: RoleId,
}
