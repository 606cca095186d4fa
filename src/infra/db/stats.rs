use async_trait::async_trait;

use crate::application::repos::{RepoError, StatsRepo};
use crate::domain::entities::SiteCounts;

use super::{PostgresRepositories, map_sqlx_error};

#[async_trait]
impl StatsRepo for PostgresRepositories {
    async fn site_counts(&self) -> Result<SiteCounts, RepoError> {
        let (users, problems, submissions, languages): (i64, i64, i64, i64) = sqlx::query_as(
            "SELECT \
                 (SELECT COUNT(*) FROM profiles), \
                 (SELECT COUNT(*) FROM problems WHERE is_public), \
                 (SELECT COUNT(*) FROM submissions), \
                 (SELECT COUNT(*) FROM languages)",
        )
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(SiteCounts {
            users,
            problems,
            submissions,
            languages,
        })
    }
}
