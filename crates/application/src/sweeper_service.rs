use std::sync::Arc;

use chrono::{DateTime, Utc};

use clavis_core::AppResult;

use crate::rbac_ports::{RbacRepository, SweepOutcome};

/// Background pass that deactivates expired assignments and grants.
///
/// The sweep is hygiene, not enforcement: evaluation already ignores
/// expired rows, so a delayed or skipped sweep never grants access.
#[derive(Clone)]
pub struct SweeperService {
    repository: Arc<dyn RbacRepository>,
}

impl SweeperService {
    /// Creates a new service from required dependencies.
    #[must_use]
    pub fn new(repository: Arc<dyn RbacRepository>) -> Self {
        Self { repository }
    }

    /// Deactivates every active row whose expiry lies before `now`.
    pub async fn sweep(&self, now: DateTime<Utc>) -> AppResult<SweepOutcome> {
        let outcome = self.repository.deactivate_expired(now).await?;

        if outcome.total() > 0 {
            tracing::info!(
                assignments = outcome.assignments_deactivated,
                grants = outcome.grants_deactivated,
                "deactivated expired access rows"
            );
        } else {
            tracing::debug!("no expired access rows to deactivate");
        }

        Ok(outcome)
    }
}
