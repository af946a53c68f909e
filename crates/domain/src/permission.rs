use std::str::FromStr;

use clavis_core::{AppError, AppResult, NonEmptyString};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::condition::AccessCondition;

/// Unique identifier for a permission.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PermissionId(Uuid);

impl PermissionId {
    /// Creates a new random permission identifier.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Creates a permission identifier from an existing UUID value.
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

impl Default for PermissionId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for PermissionId {
    fn fmt(&self, formatter: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(formatter, "{}", self.0)
    }
}

/// Breadth of resources a permission applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PermissionScope {
    /// Only resources owned by the requesting user.
    Own,
    /// Resources belonging to the user's team.
    Team,
    /// Resources belonging to the user's organization.
    Organization,
    /// Every resource of the matching type.
    Global,
}

impl PermissionScope {
    /// Returns a stable storage value for this scope.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Own => "own",
            Self::Team => "team",
            Self::Organization => "organization",
            Self::Global => "global",
        }
    }
}

impl FromStr for PermissionScope {
    type Err = AppError;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "own" => Ok(Self::Own),
            "team" => Ok(Self::Team),
            "organization" => Ok(Self::Organization),
            "global" => Ok(Self::Global),
            _ => Err(AppError::InvalidScope(format!(
                "unsupported scope value '{value}'"
            ))),
        }
    }
}

/// A named grant of one action on one resource type within a scope.
///
/// `(resource_type, action, scope)` is deliberately not unique: several
/// permissions may share the triple and differ only in their conditions.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Permission {
    /// Stable permission identifier.
    pub id: PermissionId,
    /// Unique machine name.
    pub name: NonEmptyString,
    /// Resource type label, e.g. `document`.
    pub resource_type: String,
    /// Action label, e.g. `read`.
    pub action: String,
    /// Scope breadth.
    pub scope: PermissionScope,
    /// Predicates that must all hold for the permission to apply.
    pub conditions: Vec<AccessCondition>,
    /// Soft-disable flag.
    pub is_active: bool,
}

/// Input payload for creating a permission.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PermissionInput {
    /// Unique machine name.
    pub name: String,
    /// Resource type label.
    pub resource_type: String,
    /// Action label.
    pub action: String,
    /// Scope breadth.
    pub scope: PermissionScope,
    /// Attached predicates; empty means unconditional.
    pub conditions: Vec<AccessCondition>,
}

impl Permission {
    /// Creates a validated permission with a fresh identifier.
    pub fn new(input: PermissionInput) -> AppResult<Self> {
        let name = NonEmptyString::new(input.name)?;

        if input.resource_type.trim().is_empty() {
            return Err(AppError::Validation(
                "permission resource_type must not be empty".to_owned(),
            ));
        }

        if input.action.trim().is_empty() {
            return Err(AppError::Validation(
                "permission action must not be empty".to_owned(),
            ));
        }

        for condition in &input.conditions {
            condition.validate()?;
        }

        Ok(Self {
            id: PermissionId::new(),
            name,
            resource_type: input.resource_type,
            action: input.action,
            scope: input.scope,
            conditions: input.conditions,
            is_active: true,
        })
    }

    /// Returns whether the permission targets the given resource type and action.
    #[must_use]
    pub fn matches(&self, resource_type: &str, action: &str) -> bool {
        self.resource_type == resource_type && self.action == action
    }
}
