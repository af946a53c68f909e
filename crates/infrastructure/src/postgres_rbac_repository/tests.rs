use std::collections::BTreeSet;

use chrono::{Duration, Utc};
use sqlx::PgPool;
use sqlx::migrate::Migrator;
use sqlx::postgres::PgPoolOptions;

use clavis_application::RbacRepository;
use clavis_core::AppError;
use clavis_domain::{
    GrantId, ResourceAccessGrant, Role, RoleInput, UserId, UserRoleAssignment,
};

use super::PostgresRbacRepository;

static MIGRATOR: Migrator = sqlx::migrate!("./migrations");

async fn test_pool() -> Option<PgPool> {
    let Ok(database_url) = std::env::var("DATABASE_URL") else {
        return None;
    };

    let pool = match PgPoolOptions::new()
        .max_connections(2)
        .connect(database_url.as_str())
        .await
    {
        Ok(pool) => pool,
        Err(error) => panic!("failed to connect to DATABASE_URL in test: {error}"),
    };

    if let Err(error) = MIGRATOR.run(&pool).await {
        panic!("failed to run migrations for postgres rbac tests: {error}");
    }

    Some(pool)
}

fn unique_role() -> Role {
    Role::new(RoleInput {
        name: format!("role-{}", uuid::Uuid::new_v4()),
        display_name: None,
        priority: 0,
        is_system: false,
        max_users: None,
        expires_at: None,
    })
    .unwrap_or_else(|_| unreachable!("test role input is valid"))
}

#[tokio::test]
async fn role_roundtrips_through_storage() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRbacRepository::new(pool);

    let role = unique_role();
    assert!(repository.insert_role(role.clone()).await.is_ok());

    let loaded = repository.find_role(role.id).await;
    assert!(loaded.is_ok());
    assert_eq!(loaded.unwrap_or(None), Some(role));
}

#[tokio::test]
async fn duplicate_role_name_maps_to_conflict() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRbacRepository::new(pool);

    let first = unique_role();
    assert!(repository.insert_role(first.clone()).await.is_ok());

    let mut duplicate = unique_role();
    duplicate.name = first.name.clone();
    let result = repository.insert_role(duplicate).await;
    assert!(matches!(result, Err(AppError::Conflict(_))));
}

#[tokio::test]
async fn cycle_closing_edge_is_rejected_in_storage() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRbacRepository::new(pool);

    let (a, b, c) = (unique_role(), unique_role(), unique_role());
    for role in [&a, &b, &c] {
        assert!(repository.insert_role(role.clone()).await.is_ok());
    }

    assert!(repository.add_hierarchy_edge(a.id, b.id).await.is_ok());
    assert!(repository.add_hierarchy_edge(b.id, c.id).await.is_ok());

    let result = repository.add_hierarchy_edge(c.id, a.id).await;
    assert!(matches!(result, Err(AppError::CycleDetected(_))));
}

#[tokio::test]
async fn second_active_assignment_loses_the_race() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRbacRepository::new(pool);

    let role = unique_role();
    assert!(repository.insert_role(role.clone()).await.is_ok());
    let user = UserId::new();
    let now = Utc::now();

    let first = repository
        .insert_assignment(UserRoleAssignment::new(user, role.id, UserId::new(), now, None))
        .await;
    assert!(first.unwrap_or(false));

    let second = repository
        .insert_assignment(UserRoleAssignment::new(user, role.id, UserId::new(), now, None))
        .await;
    assert!(!second.unwrap_or(true));
}

#[tokio::test]
async fn regrant_replaces_action_set_in_storage() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRbacRepository::new(pool);

    let user = UserId::new();
    let resource_id = uuid::Uuid::new_v4().to_string();

    let grant = |actions: &[&str]| ResourceAccessGrant {
        id: GrantId::new(),
        user_id: user,
        resource_type: "document".to_owned(),
        resource_id: resource_id.clone(),
        actions: actions
            .iter()
            .map(|action| (*action).to_owned())
            .collect::<BTreeSet<_>>(),
        granted_by: UserId::new(),
        granted_at: Utc::now(),
        expires_at: None,
        is_active: true,
    };

    assert!(repository
        .upsert_resource_grant(grant(&["read", "comment"]))
        .await
        .is_ok());
    assert!(repository
        .upsert_resource_grant(grant(&["sign"]))
        .await
        .is_ok());

    let loaded = repository
        .find_active_resource_grant(user, "document", resource_id.as_str())
        .await;
    assert!(loaded.is_ok());
    let loaded = loaded.unwrap_or(None);
    assert!(loaded.as_ref().is_some_and(|grant| grant.allows("sign")));
    assert!(!loaded.as_ref().is_some_and(|grant| grant.allows("read")));
}

#[tokio::test]
async fn sweep_deactivates_expired_rows_in_storage() {
    let Some(pool) = test_pool().await else {
        return;
    };
    let repository = PostgresRbacRepository::new(pool);

    let role = unique_role();
    assert!(repository.insert_role(role.clone()).await.is_ok());
    let user = UserId::new();
    let now = Utc::now();

    assert!(repository
        .insert_assignment(UserRoleAssignment::new(
            user,
            role.id,
            UserId::new(),
            now - Duration::days(1),
            Some(now - Duration::hours(1)),
        ))
        .await
        .is_ok());

    let outcome = repository.deactivate_expired(now).await;
    assert!(outcome.is_ok());
    assert!(outcome.map(|o| o.assignments_deactivated >= 1).unwrap_or(false));

    let active = repository.find_active_assignment(user, role.id).await;
    assert_eq!(active.unwrap_or(None), None);
}
