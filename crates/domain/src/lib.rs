//! Domain entities and invariants for the access-control engine.

#![forbid(unsafe_code)]

mod assignment;
mod audit;
mod condition;
mod grant;
mod permission;
mod role;
mod user;

pub use assignment::{AssignmentId, UserRoleAssignment};
pub use audit::AuditAction;
pub use condition::{AccessCondition, CheckContext};
pub use grant::{GrantId, ResourceAccessGrant};
pub use permission::{Permission, PermissionId, PermissionInput, PermissionScope};
pub use role::{Role, RoleHierarchyEdge, RoleId, RoleInput};
pub use user::UserId;
