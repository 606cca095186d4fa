use std::collections::HashMap;

use async_trait::async_trait;
use sqlx::{Postgres, QueryBuilder};
use time::OffsetDateTime;

use crate::application::repos::{FeedScope, PostsRepo, RepoError};
use crate::domain::entities::{BlogPostRecord, OrganizationRecord, PostAuthor};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct BlogPostRow {
    id: i64,
    title: String,
    content_markdown: String,
    og_image: Option<String>,
    visible: bool,
    sticky: bool,
    publish_on: OffsetDateTime,
    is_organization_private: bool,
}

impl BlogPostRow {
    fn into_record(
        self,
        authors: Vec<PostAuthor>,
        organizations: Vec<OrganizationRecord>,
    ) -> BlogPostRecord {
        BlogPostRecord {
            id: self.id,
            title: self.title,
            content_markdown: self.content_markdown,
            og_image: self.og_image,
            visible: self.visible,
            sticky: self.sticky,
            publish_on: self.publish_on,
            is_organization_private: self.is_organization_private,
            authors,
            organizations,
        }
    }
}

#[derive(sqlx::FromRow)]
struct PostAuthorRow {
    post_id: i64,
    profile_id: i64,
    username: String,
}

#[derive(sqlx::FromRow)]
struct PostOrganizationRow {
    post_id: i64,
    organization_id: i64,
    slug: String,
    name: String,
}

const POST_COLUMNS: &str = "p.id, p.title, p.content_markdown, p.og_image, p.visible, \
     p.sticky, p.publish_on, p.is_organization_private";

impl PostgresRepositories {
    /// The published-feed WHERE clause. Matches the in-process visibility
    /// predicate so pagination cannot widen the result set; the author and
    /// superuser escape hatches apply to direct fetches only.
    fn apply_published_filter<'q>(qb: &mut QueryBuilder<'q, Postgres>, scope: &'q FeedScope) {
        qb.push(" WHERE p.visible AND p.publish_on <= ");
        qb.push_bind(Self::scope_now(scope));
        qb.push(" AND (NOT p.is_organization_private OR EXISTS (\
             SELECT 1 FROM blog_post_organizations bpo \
             WHERE bpo.post_id = p.id AND bpo.organization_id = ANY(");
        qb.push_bind(&scope.viewer_organizations);
        qb.push("))) ");
        if let Some(organization) = scope.organization {
            qb.push(" AND EXISTS (\
                 SELECT 1 FROM blog_post_organizations bpo \
                 WHERE bpo.post_id = p.id AND bpo.organization_id = ");
            qb.push_bind(organization);
            qb.push(") ");
        }
    }

    async fn attach_links(
        &self,
        rows: Vec<BlogPostRow>,
    ) -> Result<Vec<BlogPostRecord>, RepoError> {
        let ids: Vec<i64> = rows.iter().map(|row| row.id).collect();

        let author_rows: Vec<PostAuthorRow> = sqlx::query_as(
            "SELECT bpa.post_id, pr.id AS profile_id, pr.username \
             FROM blog_post_authors bpa \
             INNER JOIN profiles pr ON pr.id = bpa.profile_id \
             WHERE bpa.post_id = ANY($1) \
             ORDER BY bpa.post_id, pr.username",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let organization_rows: Vec<PostOrganizationRow> = sqlx::query_as(
            "SELECT bpo.post_id, o.id AS organization_id, o.slug, o.name \
             FROM blog_post_organizations bpo \
             INNER JOIN organizations o ON o.id = bpo.organization_id \
             WHERE bpo.post_id = ANY($1) \
             ORDER BY bpo.post_id, o.slug",
        )
        .bind(&ids)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let mut authors: HashMap<i64, Vec<PostAuthor>> = HashMap::new();
        for row in author_rows {
            authors.entry(row.post_id).or_default().push(PostAuthor {
                id: row.profile_id,
                username: row.username,
            });
        }

        let mut organizations: HashMap<i64, Vec<OrganizationRecord>> = HashMap::new();
        for row in organization_rows {
            organizations
                .entry(row.post_id)
                .or_default()
                .push(OrganizationRecord {
                    id: row.organization_id,
                    slug: row.slug,
                    name: row.name,
                });
        }

        Ok(rows
            .into_iter()
            .map(|row| {
                let post_authors = authors.remove(&row.id).unwrap_or_default();
                let post_organizations = organizations.remove(&row.id).unwrap_or_default();
                row.into_record(post_authors, post_organizations)
            })
            .collect())
    }
}

#[async_trait]
impl PostsRepo for PostgresRepositories {
    async fn list_published(
        &self,
        scope: &FeedScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<BlogPostRecord>, RepoError> {
        let mut qb = QueryBuilder::new(format!("SELECT {POST_COLUMNS} FROM blog_posts p"));
        Self::apply_published_filter(&mut qb, scope);
        qb.push(" ORDER BY p.sticky DESC, p.publish_on DESC, p.id DESC LIMIT ");
        qb.push_bind(Self::convert_limit(limit));
        qb.push(" OFFSET ");
        qb.push_bind(Self::convert_limit(offset));

        let rows: Vec<BlogPostRow> = qb
            .build_query_as()
            .fetch_all(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        self.attach_links(rows).await
    }

    async fn count_published(&self, scope: &FeedScope) -> Result<u64, RepoError> {
        let mut qb = QueryBuilder::new("SELECT COUNT(*) FROM blog_posts p");
        Self::apply_published_filter(&mut qb, scope);

        let (count,): (i64,) = qb
            .build_query_as()
            .fetch_one(self.pool())
            .await
            .map_err(map_sqlx_error)?;

        Self::convert_count(count)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<BlogPostRecord>, RepoError> {
        let row: Option<BlogPostRow> = sqlx::query_as(&format!(
            "SELECT {POST_COLUMNS} FROM blog_posts p WHERE p.id = $1"
        ))
        .bind(id)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(None);
        };
        let mut records = self.attach_links(vec![row]).await?;
        Ok(records.pop())
    }
}
