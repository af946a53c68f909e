//! Infrastructure adapters for application ports.

#![forbid(unsafe_code)]

mod in_memory_decision_cache;
mod in_memory_rbac_repository;
mod postgres_audit_sink;
mod postgres_rbac_repository;
mod static_membership_provider;
mod tracing_audit_sink;

pub use in_memory_decision_cache::InMemoryDecisionCache;
pub use in_memory_rbac_repository::InMemoryRbacRepository;
pub use postgres_audit_sink::PostgresAuditSink;
pub use postgres_rbac_repository::PostgresRbacRepository;
pub use static_membership_provider::StaticMembershipProvider;
pub use tracing_audit_sink::TracingAuditSink;
