use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{RepoError, TicketsRepo};
use crate::domain::entities::{TicketLink, TicketRecord};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct TicketRow {
    id: i64,
    title: String,
    owner_id: i64,
    owner_username: String,
    is_open: bool,
    created_at: OffsetDateTime,
    problem_code: Option<String>,
    problem_name: Option<String>,
    problem_is_public: Option<bool>,
}

impl TicketRow {
    fn into_record(self, assignee_ids: Vec<i64>) -> TicketRecord {
        let linked_item = match (self.problem_code, self.problem_name, self.problem_is_public) {
            (Some(code), Some(name), Some(is_public)) => Some(TicketLink {
                label: name,
                url: format!("/problem/{code}"),
                is_public,
            }),
            _ => None,
        };
        TicketRecord {
            id: self.id,
            title: self.title,
            owner_id: self.owner_id,
            owner_username: self.owner_username,
            is_open: self.is_open,
            created_at: self.created_at,
            assignee_ids,
            linked_item,
        }
    }
}

const TICKET_COLUMNS: &str = "t.id, t.title, t.owner_id, pr.username AS owner_username, \
     t.is_open, t.created_at, t.problem_code, pb.name AS problem_name, \
     pb.is_public AS problem_is_public";

const TICKET_FROM: &str = " FROM tickets t \
     INNER JOIN profiles pr ON pr.id = t.owner_id \
     LEFT JOIN problems pb ON pb.code = t.problem_code \
     WHERE t.is_open ";

enum TicketFilter {
    /// Owner or assignee.
    Own,
    /// Owner, assignee, public linked item, or no linked item left.
    Visible,
}

impl PostgresRepositories {
    fn apply_ticket_filter(qb: &mut QueryBuilder<'_, Postgres>, filter: TicketFilter, profile_id: i64) {
        qb.push(" AND (t.owner_id = ");
        qb.push_bind(profile_id);
        qb.push(" OR EXISTS (\
             SELECT 1 FROM ticket_assignees ta \
             WHERE ta.ticket_id = t.id AND ta.profile_id = ");
        qb.push_bind(profile_id);
        qb.push(")");
        if let TicketFilter::Visible = filter {
            qb.push(" OR t.problem_code IS NULL OR pb.is_public");
        }
        qb.push(") ");
    }

    async fn list_tickets(
        &self,
        filter: TicketFilter,
        profile_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TicketRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {TICKET_COLUMNS}{TICKET_FROM}"));
        Self::apply_ticket_filter(&mut qb, filter, profile_id);
        qb.push(" ORDER BY t.id DESC LIMIT ");
        qb.push_bind(Self::convert_limit(limit));
        qb.push(" OFFSET ");
        qb.push_bind(Self::convert_limit(offset));

        let rows: Vec<TicketRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.attach_assignees(rows).await
    }

    async fn count_tickets(
        &self,
        filter: TicketFilter,
        profile_id: i64,
    ) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT COUNT(*){TICKET_FROM}"));
        Self::apply_ticket_filter(&mut qb, filter, profile_id);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn attach_assignees(
        &self,
        rows: Vec<TicketRow>,
    ) -> Result<Vec<TicketRecord>, RepoError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let assignee_rows: Vec<(i64, i64)> = sqlx::query_as(
            "SELECT ticket_id, profile_id FROM ticket_assignees \
             WHERE ticket_id = ANY($1) ORDER BY ticket_id, profile_id",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut assignees: HashMap<i64, Vec<i64>> = HashMap::new();
        for (ticket_id, profile_id) in assignee_rows {
            assignees.entry(ticket_id).or_default().push(profile_id);
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let ids = assignees.remove(&row.id).unwrap_or_default();
                row.into_record(ids)
            })
            .collect())
    }
}

#[async_trait]
impl TicketsRepo for PostgresRepositories {
    async fn list_own_open(
        &self,
        profile_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TicketRecord>, RepoError> {
        self.list_tickets(TicketFilter::Own, profile_id, offset, limit)
            .await
    }

    async fn count_own_open(&self, profile_id: i64) -> Result<u64, RepoError> {
        self.count_tickets(TicketFilter::Own, profile_id).await
    }

    async fn list_all_open(
        &self,
        profile_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TicketRecord>, RepoError> {
        self.list_tickets(TicketFilter::Visible, profile_id, offset, limit)
            .await
    }

    async fn count_all_open(&self, profile_id: i64) -> Result<u64, RepoError> {
        self.count_tickets(TicketFilter::Visible, profile_id).await
    }
}
