//! Ports consumed and exposed by the engine's services.

mod audit;
mod cache;
mod membership;
mod projections;
mod repository;

pub use audit::{AuditEvent, AuditSink};
pub use cache::{DecisionCache, DecisionKey};
pub use membership::MembershipProvider;
pub use projections::{AssignRoleOutcome, UserRoleBinding};
pub use repository::{RbacRepository, SweepOutcome};
