use std::collections::HashMap;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use tokio::sync::RwLock;

use clavis_application::{DecisionCache, DecisionKey};
use clavis_core::AppResult;

#[derive(Debug, Clone, Copy)]
struct DecisionEntry {
    allowed: bool,
    expires_at: Instant,
}

/// In-memory decision cache with a fixed TTL per entry.
///
/// There is no invalidation on mutation; the TTL alone bounds how long a
/// stale allow can survive a revoke, so it should stay in the tens of
/// seconds.
pub struct InMemoryDecisionCache {
    ttl: Duration,
    entries: RwLock<HashMap<DecisionKey, DecisionEntry>>,
}

impl InMemoryDecisionCache {
    /// Creates a cache whose entries expire after `ttl`.
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self {
            ttl,
            entries: RwLock::new(HashMap::new()),
        }
    }
}

#[async_trait]
impl DecisionCache for InMemoryDecisionCache {
    async fn get(&self, key: &DecisionKey) -> AppResult<Option<bool>> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                Some(entry) if entry.expires_at > Instant::now() => {
                    return Ok(Some(entry.allowed));
                }
                Some(_) => {}
                None => return Ok(None),
            }
        }

        let mut entries = self.entries.write().await;
        if entries
            .get(key)
            .is_some_and(|entry| entry.expires_at <= Instant::now())
        {
            entries.remove(key);
        }

        Ok(None)
    }

    async fn put(&self, key: DecisionKey, allowed: bool) -> AppResult<()> {
        if self.ttl.is_zero() {
            return Ok(());
        }

        let now = Instant::now();
        let expires_at = now.checked_add(self.ttl).unwrap_or(now);

        self.entries
            .write()
            .await
            .insert(key, DecisionEntry { allowed, expires_at });

        Ok(())
    }
}
