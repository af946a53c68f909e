use clavis_domain::{Role, UserRoleAssignment};

/// Result of an `assign_role` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AssignRoleOutcome {
    /// Whether a new assignment row was created. `false` means the user
    /// already held the role; re-assignment is idempotent, not an error.
    pub created: bool,
}

/// A user's live role together with the assignment that grants it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserRoleBinding {
    /// The granted role.
    pub role: Role,
    /// The assignment row backing the grant.
    pub assignment: UserRoleAssignment,
}
