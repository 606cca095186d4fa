use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};

use crate::application::repos::{ProfilesRepo, RepoError};
use crate::domain::entities::ProfileRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ProfileRow {
    id: i64,
    username: String,
    rating: Option<i32>,
    performance_points: f64,
    is_unlisted: bool,
}

impl From<ProfileRow> for ProfileRecord {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            username: row.username,
            rating: row.rating,
            performance_points: row.performance_points,
            is_unlisted: row.is_unlisted,
        }
    }
}

impl PostgresRepositories {
    fn apply_leaderboard_filter(
        qb: &mut QueryBuilder<'_, Postgres>,
        organization: Option<i64>,
    ) {
        qb.push(" WHERE NOT pr.is_unlisted ");
        if let Some(organization) = organization {
            qb.push(" AND EXISTS (\
                 SELECT 1 FROM organization_members om \
                 WHERE om.profile_id = pr.id AND om.organization_id = ");
            qb.push_bind(organization);
            qb.push(") ");
        }
    }

    async fn leaderboard(
        &self,
        organization: Option<i64>,
        limit: u64,
        order: &str,
    ) -> Result<Vec<ProfileRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT pr.id, pr.username, pr.rating, pr.performance_points, pr.is_unlisted \
             FROM profiles pr",
        );
        Self::apply_leaderboard_filter(&mut qb, organization);
        qb.push(order);
        qb.push(" LIMIT ");
        qb.push_bind(Self::convert_limit(limit));

        let rows: Vec<ProfileRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ProfileRecord::from).collect())
    }
}

#[async_trait]
impl ProfilesRepo for PostgresRepositories {
    async fn top_rated(
        &self,
        organization: Option<i64>,
        limit: u64,
    ) -> Result<Vec<ProfileRecord>, RepoError> {
        self.leaderboard(
            organization,
            limit,
            " AND pr.rating IS NOT NULL ORDER BY pr.rating DESC, pr.username ",
        )
        .await
    }

    async fn top_scorers(
        &self,
        organization: Option<i64>,
        limit: u64,
    ) -> Result<Vec<ProfileRecord>, RepoError> {
        self.leaderboard(
            organization,
            limit,
            " ORDER BY pr.performance_points DESC, pr.username ",
        )
        .await
    }
}
