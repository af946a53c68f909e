use std::collections::HashSet;

use async_trait::async_trait;
use tokio::sync::RwLock;

use clavis_application::MembershipProvider;
use clavis_core::AppResult;
use clavis_domain::{CheckContext, PermissionScope, UserId};

/// Membership provider backed by statically configured rosters.
///
/// Deployments without an external directory register team and
/// organization members up front; unknown pairs resolve to non-member.
#[derive(Default)]
pub struct StaticMembershipProvider {
    team_members: RwLock<HashSet<(UserId, String)>>,
    organization_members: RwLock<HashSet<(UserId, String)>>,
}

impl StaticMembershipProvider {
    /// Creates an empty provider.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers a user as a member of a team.
    pub async fn add_team_member(&self, user_id: UserId, team_id: &str) {
        self.team_members
            .write()
            .await
            .insert((user_id, team_id.to_owned()));
    }

    /// Registers a user as a member of an organization.
    pub async fn add_organization_member(&self, user_id: UserId, organization_id: &str) {
        self.organization_members
            .write()
            .await
            .insert((user_id, organization_id.to_owned()));
    }
}

#[async_trait]
impl MembershipProvider for StaticMembershipProvider {
    async fn is_member(
        &self,
        user_id: UserId,
        scope: PermissionScope,
        context: &CheckContext,
    ) -> AppResult<bool> {
        let is_member = match scope {
            PermissionScope::Team => match &context.team_id {
                Some(team_id) => self
                    .team_members
                    .read()
                    .await
                    .contains(&(user_id, team_id.clone())),
                None => false,
            },
            PermissionScope::Organization => match &context.organization_id {
                Some(organization_id) => self
                    .organization_members
                    .read()
                    .await
                    .contains(&(user_id, organization_id.clone())),
                None => false,
            },
            PermissionScope::Own | PermissionScope::Global => false,
        };

        Ok(is_member)
    }
}
