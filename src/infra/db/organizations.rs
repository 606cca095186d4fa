use async_trait::async_trait;

use crate::application::repos::{OrganizationsRepo, RepoError};
use crate::domain::entities::OrganizationRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct OrganizationRow {
    id: i64,
    slug: String,
    name: String,
}

impl From<OrganizationRow> for OrganizationRecord {
    fn from(row: OrganizationRow) -> Self {
        Self {
            id: row.id,
            slug: row.slug,
            name: row.name,
        }
    }
}

#[async_trait]
impl OrganizationsRepo for PostgresRepositories {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<OrganizationRecord>, RepoError> {
        let row: Option<OrganizationRow> =
            sqlx::query_as("SELECT id, slug, name FROM organizations WHERE slug = $1")
                .bind(slug)
                .fetch_optional(self.pool())
                .await
                .map_err(map_sqlx_error)?;

        Ok(row.map(OrganizationRecord::from))
    }

    async fn most_recent_for(
        &self,
        profile_id: i64,
        limit: u64,
    ) -> Result<Vec<OrganizationRecord>, RepoError> {
        let rows: Vec<OrganizationRow> = sqlx::query_as(
            "SELECT o.id, o.slug, o.name \
             FROM organization_visits ov \
             INNER JOIN organizations o ON o.id = ov.organization_id \
             WHERE ov.profile_id = $1 \
             ORDER BY ov.visited_at DESC \
             LIMIT $2",
        )
        .bind(profile_id)
        .bind(Self::convert_limit(limit))
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(OrganizationRecord::from).collect())
    }
}
