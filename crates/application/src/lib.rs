//! Application services and ports for the access-control engine.

#![forbid(unsafe_code)]

mod assignment_service;
mod catalog_service;
mod hierarchy_service;
mod policy_service;
mod rbac_ports;
mod sweeper_service;

#[cfg(test)]
mod test_support;

pub use assignment_service::AssignmentService;
pub use catalog_service::CatalogService;
pub use hierarchy_service::HierarchyService;
pub use policy_service::{CheckRequest, PolicyService};
pub use rbac_ports::{
    AssignRoleOutcome, AuditEvent, AuditSink, DecisionCache, DecisionKey, MembershipProvider,
    RbacRepository, SweepOutcome, UserRoleBinding,
};
pub use sweeper_service::SweeperService;
