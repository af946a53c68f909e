use super::*;

impl PostgresRbacRepository {
    pub(super) async fn parents_of_impl(&self, role_id: RoleId) -> AppResult<Vec<RoleId>> {
        let parents = sqlx::query_scalar::<_, uuid::Uuid>(
            r#"
            SELECT parent_role_id
            FROM rbac_role_hierarchy
            WHERE child_role_id = $1
            "#,
        )
        .bind(role_id.as_uuid())
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to load parent roles: {error}")))?;

        Ok(parents.into_iter().map(RoleId::from_uuid).collect())
    }

    pub(super) async fn add_hierarchy_edge_impl(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<()> {
        let mut transaction = self.pool.begin().await.map_err(|error| {
            AppError::Storage(format!("failed to begin transaction: {error}"))
        })?;

        // Serialize edge writers so the reachability check and the insert
        // see the same edge set.
        sqlx::query(
            r#"
            LOCK TABLE rbac_role_hierarchy IN SHARE ROW EXCLUSIVE MODE
            "#,
        )
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Storage(format!("failed to lock hierarchy: {error}")))?;

        // The new edge closes a loop when the child is already an ancestor
        // of the parent.
        let closes_cycle = sqlx::query_scalar::<_, bool>(
            r#"
            WITH RECURSIVE ancestors AS (
                SELECT parent_role_id
                FROM rbac_role_hierarchy
                WHERE child_role_id = $1
                UNION
                SELECT hierarchy.parent_role_id
                FROM rbac_role_hierarchy AS hierarchy
                INNER JOIN ancestors
                    ON hierarchy.child_role_id = ancestors.parent_role_id
            )
            SELECT EXISTS (
                SELECT 1 FROM ancestors WHERE parent_role_id = $2
            )
            "#,
        )
        .bind(parent_role_id.as_uuid())
        .bind(child_role_id.as_uuid())
        .fetch_one(&mut *transaction)
        .await
        .map_err(|error| AppError::Storage(format!("failed to check for cycles: {error}")))?;

        if closes_cycle {
            return Err(AppError::CycleDetected(format!(
                "edge '{parent_role_id}:{child_role_id}' would create a cycle"
            )));
        }

        sqlx::query(
            r#"
            INSERT INTO rbac_role_hierarchy (parent_role_id, child_role_id)
            VALUES ($1, $2)
            ON CONFLICT (parent_role_id, child_role_id) DO NOTHING
            "#,
        )
        .bind(parent_role_id.as_uuid())
        .bind(child_role_id.as_uuid())
        .execute(&mut *transaction)
        .await
        .map_err(|error| AppError::Storage(format!("failed to insert edge: {error}")))?;

        transaction.commit().await.map_err(|error| {
            AppError::Storage(format!("failed to commit transaction: {error}"))
        })?;

        Ok(())
    }

    pub(super) async fn remove_hierarchy_edge_impl(
        &self,
        parent_role_id: RoleId,
        child_role_id: RoleId,
    ) -> AppResult<bool> {
        let rows_affected = sqlx::query(
            r#"
            DELETE FROM rbac_role_hierarchy
            WHERE parent_role_id = $1
                AND child_role_id = $2
            "#,
        )
        .bind(parent_role_id.as_uuid())
        .bind(child_role_id.as_uuid())
        .execute(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to remove edge: {error}")))?
        .rows_affected();

        Ok(rows_affected > 0)
    }

    pub(super) async fn list_hierarchy_edges_impl(&self) -> AppResult<Vec<RoleHierarchyEdge>> {
        let rows = sqlx::query_as::<_, (uuid::Uuid, uuid::Uuid)>(
            r#"
            SELECT parent_role_id, child_role_id
            FROM rbac_role_hierarchy
            "#,
        )
        .fetch_all(&self.pool)
        .await
        .map_err(|error| AppError::Storage(format!("failed to list edges: {error}")))?;

        Ok(rows
            .into_iter()
            .map(|(parent, child)| RoleHierarchyEdge {
                parent_role_id: RoleId::from_uuid(parent),
                child_role_id: RoleId::from_uuid(child),
            })
            .collect())
    }
}
