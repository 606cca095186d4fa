use async_trait::async_trait;
use sqlx::QueryBuilder;
use time::OffsetDateTime;

use crate::application::repos::{CommentsRepo, RepoError};
use crate::domain::comments::{PageKind, parse_page_key};
use crate::domain::entities::CommentRecord;

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct CommentRow {
    id: i64,
    page: String,
    author_id: i64,
    author_username: String,
    body_markdown: String,
    hidden: bool,
    created_at: OffsetDateTime,
}

impl From<CommentRow> for CommentRecord {
    fn from(row: CommentRow) -> Self {
        Self {
            id: row.id,
            page: row.page,
            author_id: row.author_id,
            author_username: row.author_username,
            body_markdown: row.body_markdown,
            hidden: row.hidden,
            created_at: row.created_at,
        }
    }
}

#[async_trait]
impl CommentsRepo for PostgresRepositories {
    async fn count_by_page(&self, pages: &[String]) -> Result<Vec<(String, i64)>, RepoError> {
        if pages.is_empty() {
            return Ok(Vec::new());
        }
        let rows: Vec<(String, i64)> = sqlx::query_as(
            "SELECT page, COUNT(*) FROM comments \
             WHERE NOT hidden AND page = ANY($1) \
             GROUP BY page",
        )
        .bind(pages)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        Ok(rows)
    }

    async fn most_recent(
        &self,
        limit: u64,
        organization: Option<i64>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let mut qb = QueryBuilder::new(
            "SELECT c.id, c.page, c.author_id, pr.username AS author_username, \
             c.body_markdown, c.hidden, c.created_at \
             FROM comments c \
             INNER JOIN profiles pr ON pr.id = c.author_id \
             WHERE NOT c.hidden ",
        );
        if let Some(organization) = organization {
            qb.push(" AND EXISTS (\
                 SELECT 1 FROM organization_members om \
                 WHERE om.profile_id = c.author_id AND om.organization_id = ");
            qb.push_bind(organization);
            qb.push(") ");
        }
        qb.push(" ORDER BY c.id DESC LIMIT ");
        qb.push_bind(Self::convert_limit(limit));

        let rows: Vec<CommentRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Ok(rows.into_iter().map(CommentRecord::from).collect())
    }

    async fn page_title(&self, page: &str) -> Result<Option<String>, RepoError> {
        let title: Option<(String,)> = match parse_page_key(page) {
            PageKind::BlogPost(id) => {
                sqlx::query_as("SELECT title FROM blog_posts WHERE id = $1")
                    .bind(id)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(map_sqlx_error)?
            }
            PageKind::Problem(code) => {
                sqlx::query_as("SELECT name FROM problems WHERE code = $1")
                    .bind(code)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(map_sqlx_error)?
            }
            PageKind::Contest(key) => {
                sqlx::query_as("SELECT name FROM contests WHERE key = $1")
                    .bind(key)
                    .fetch_optional(self.pool())
                    .await
                    .map_err(map_sqlx_error)?
            }
            PageKind::Other(_) => None,
        };

        Ok(title.map(|(title,)| title))
    }
}
