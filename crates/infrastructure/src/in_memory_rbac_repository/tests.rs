use chrono::{Duration, Utc};

use clavis_application::RbacRepository;
use clavis_core::AppError;
use clavis_domain::{Role, RoleId, RoleInput, UserId, UserRoleAssignment};

use super::InMemoryRbacRepository;

fn role(name: &str) -> Role {
    Role::new(RoleInput {
        name: name.to_owned(),
        display_name: None,
        priority: 0,
        is_system: false,
        max_users: None,
        expires_at: None,
    })
    .unwrap_or_else(|_| unreachable!("test role input is valid"))
}

#[tokio::test]
async fn duplicate_role_name_is_a_conflict() {
    let repository = InMemoryRbacRepository::new();

    assert!(repository.insert_role(role("ops")).await.is_ok());
    let result = repository.insert_role(role("ops")).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn cycle_closing_edge_is_rejected() {
    let repository = InMemoryRbacRepository::new();
    let (a, b, c) = (RoleId::new(), RoleId::new(), RoleId::new());

    assert!(repository.add_hierarchy_edge(a, b).await.is_ok());
    assert!(repository.add_hierarchy_edge(b, c).await.is_ok());

    let result = repository.add_hierarchy_edge(c, a).await;
    assert!(matches!(result, Err(AppError::CycleDetected(_))));

    let edges = repository.list_hierarchy_edges().await.unwrap_or_default();
    assert_eq!(edges.len(), 2);
}

#[tokio::test]
async fn duplicate_edge_insert_is_a_noop() {
    let repository = InMemoryRbacRepository::new();
    let (a, b) = (RoleId::new(), RoleId::new());

    assert!(repository.add_hierarchy_edge(a, b).await.is_ok());
    assert!(repository.add_hierarchy_edge(a, b).await.is_ok());

    let edges = repository.list_hierarchy_edges().await.unwrap_or_default();
    assert_eq!(edges.len(), 1);
}

#[tokio::test]
async fn second_active_assignment_for_a_pair_is_refused() {
    let repository = InMemoryRbacRepository::new();
    let user = UserId::new();
    let role_id = RoleId::new();
    let now = Utc::now();

    let first = repository
        .insert_assignment(UserRoleAssignment::new(user, role_id, UserId::new(), now, None))
        .await;
    assert!(first.unwrap_or(false));

    let second = repository
        .insert_assignment(UserRoleAssignment::new(user, role_id, UserId::new(), now, None))
        .await;
    assert!(!second.unwrap_or(true));
}

#[tokio::test]
async fn deactivated_pair_can_be_assigned_again() {
    let repository = InMemoryRbacRepository::new();
    let user = UserId::new();
    let role_id = RoleId::new();
    let now = Utc::now();

    assert!(repository
        .insert_assignment(UserRoleAssignment::new(user, role_id, UserId::new(), now, None))
        .await
        .is_ok());
    assert!(repository
        .deactivate_assignment(user, role_id)
        .await
        .unwrap_or(false));

    let renewed = repository
        .insert_assignment(UserRoleAssignment::new(user, role_id, UserId::new(), now, None))
        .await;
    assert!(renewed.unwrap_or(false));
}

#[tokio::test]
async fn deactivate_expired_flips_only_overdue_rows() {
    let repository = InMemoryRbacRepository::new();
    let role_id = RoleId::new();
    let now = Utc::now();

    assert!(repository
        .insert_assignment(UserRoleAssignment::new(
            UserId::new(),
            role_id,
            UserId::new(),
            now - Duration::days(1),
            Some(now - Duration::hours(1)),
        ))
        .await
        .is_ok());
    assert!(repository
        .insert_assignment(UserRoleAssignment::new(
            UserId::new(),
            role_id,
            UserId::new(),
            now,
            Some(now + Duration::hours(1)),
        ))
        .await
        .is_ok());

    let outcome = repository.deactivate_expired(now).await;
    assert!(outcome.is_ok());
    assert_eq!(
        outcome.map(|o| o.assignments_deactivated).unwrap_or_default(),
        1
    );

    let count = repository.count_active_assignments_for_role(role_id).await;
    assert_eq!(count.unwrap_or_default(), 1);
}
