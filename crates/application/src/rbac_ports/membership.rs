use async_trait::async_trait;

use clavis_core::AppResult;
use clavis_domain::{CheckContext, PermissionScope, UserId};

/// Port to the external directory that resolves `team` and `organization`
/// scope membership. The engine does not model teams itself.
#[async_trait]
pub trait MembershipProvider: Send + Sync {
    /// Returns whether the user belongs to the context's team or
    /// organization, depending on the scope under evaluation.
    async fn is_member(
        &self,
        user_id: UserId,
        scope: PermissionScope,
        context: &CheckContext,
    ) -> AppResult<bool>;
}
