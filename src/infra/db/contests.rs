use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{ContestWindow, ContestsRepo, FeedScope, RepoError};
use crate::domain::entities::{ClarificationRecord, ContestRecord, ParticipationRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct ContestRow {
    id: i64,
    key: String,
    name: String,
    start_time: OffsetDateTime,
    end_time: OffsetDateTime,
    is_visible: bool,
    is_organization_private: bool,
}

impl From<ContestRow> for ContestRecord {
    fn from(row: ContestRow) -> Self {
        Self {
            id: row.id,
            key: row.key,
            name: row.name,
            start_time: row.start_time,
            end_time: row.end_time,
            is_visible: row.is_visible,
            is_organization_private: row.is_organization_private,
        }
    }
}

#[derive(sqlx::FromRow)]
struct ClarificationRow {
    id: i64,
    problem_code: String,
    problem_name: String,
    body: String,
    date: OffsetDateTime,
}

impl PostgresRepositories {
    /// On the main site a contest shows when it is not org-private or the
    /// viewer belongs to an attached organization. Under an organization
    /// context the sidebar lists only that organization's private
    /// contests; public contests drop out entirely.
    fn apply_contest_privacy<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: &'q FeedScope) {
        match scope.organization {
            Some(organization) => {
                qb.push(" AND c.is_organization_private AND EXISTS (\
                     SELECT 1 FROM contest_organizations co \
                     WHERE co.contest_id = c.id AND co.organization_id = ");
                qb.push_bind(organization);
                qb.push(" AND co.organization_id = ANY(");
                qb.push_bind(&scope.viewer_organizations);
                qb.push(")) ");
            }
            None => {
                qb.push(" AND (NOT c.is_organization_private OR EXISTS (\
                     SELECT 1 FROM contest_organizations co \
                     WHERE co.contest_id = c.id AND co.organization_id = ANY(");
                qb.push_bind(&scope.viewer_organizations);
                qb.push("))) ");
            }
        }
    }
}

#[async_trait]
impl ContestsRepo for PostgresRepositories {
    async fn list_visible(
        &self,
        scope: &FeedScope,
        window: ContestWindow,
    ) -> Result<Vec<ContestRecord>, RepoError> {
        let now = Self::scope_now(scope);
        let mut qb = QueryBuilder::new(
            "SELECT c.id, c.key, c.name, c.start_time, c.end_time, \
             c.is_visible, c.is_organization_private \
             FROM contests c WHERE c.is_visible ",
        );
        match window {
            ContestWindow::Current => {
                qb.push(" AND c.start_time <= ");
                qb.push_bind(now);
                qb.push(" AND c.end_time > ");
                qb.push_bind(now);
            }
            ContestWindow::Future => {
                qb.push(" AND c.start_time > ");
                qb.push_bind(now);
            }
        }
        Self::apply_contest_privacy(&mut qb, scope);
        qb.push(" ORDER BY c.start_time, c.key ");

        let rows: Vec<ContestRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(ContestRecord::from).collect())
    }

    async fn current_participation(
        &self,
        profile_id: i64,
    ) -> Result<Option<ParticipationRecord>, RepoError> {
        let row: Option<(i64, String, String)> = sqlx::query_as(
            "SELECT c.id, c.key, c.name \
             FROM contest_participations cp \
             INNER JOIN contests c ON c.id = cp.contest_id \
             WHERE cp.profile_id = $1 \
               AND c.start_time <= now() AND c.end_time > now() \
             ORDER BY cp.joined_at DESC \
             LIMIT 1",
        )
        .bind(profile_id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(row.map(|(contest_id, contest_key, contest_name)| ParticipationRecord {
            contest_id,
            contest_key,
            contest_name,
        }))
    }

    async fn clarifications(
        &self,
        contest_id: i64,
    ) -> Result<Vec<ClarificationRecord>, RepoError> {
        let rows: Vec<ClarificationRow> = sqlx::query_as(
            "SELECT cl.id, cl.problem_code, pb.name AS problem_name, cl.body, cl.date \
             FROM contest_clarifications cl \
             INNER JOIN problems pb ON pb.code = cl.problem_code \
             WHERE cl.contest_id = $1 \
             ORDER BY cl.date DESC, cl.id DESC",
        )
        .bind(contest_id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows
            .into_iter()
            .map(|row| ClarificationRecord {
                id: row.id,
                problem_code: row.problem_code,
                problem_name: row.problem_name,
                body: row.body,
                date: row.date,
            })
            .collect())
    }

    async fn is_editable_by(&self, contest_id: i64, profile_id: i64) -> Result<bool, RepoError> {
        let (editable,): (bool,) = sqlx::query_as(
            "SELECT EXISTS (\
                 SELECT 1 FROM contest_editors ce \
                 WHERE ce.contest_id = $1 AND ce.profile_id = $2)",
        )
        .bind(contest_id)
        .bind(profile_id)
        .fetch_one(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(editable)
    }
}
