use async_trait::async_trait;

use clavis_core::AppResult;
use clavis_domain::UserId;

/// Cache key for one authorization decision.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DecisionKey {
    /// Requesting user.
    pub user_id: UserId,
    /// Resource type label.
    pub resource_type: String,
    /// Action label.
    pub action: String,
    /// Concrete resource instance, when the check names one.
    pub resource_id: Option<String>,
}

/// Optional short-TTL cache in front of full evaluation.
///
/// Entries must expire quickly; the engine performs no explicit
/// invalidation on mutation, so the TTL bounds the stale-allow window.
#[async_trait]
pub trait DecisionCache: Send + Sync {
    /// Returns a cached decision, if one is still fresh.
    async fn get(&self, key: &DecisionKey) -> AppResult<Option<bool>>;

    /// Stores a decision.
    async fn put(&self, key: DecisionKey, allowed: bool) -> AppResult<()>;
}
