//! Postgres-backed repository implementations.
//!
//! The schema belongs to the judge; this service only reads it. Queries
//! are assembled with `QueryBuilder` because the visibility filters vary
//! with the viewer and the organization context.

mod comments;
mod contests;
mod organizations;
mod posts;
mod profiles;
mod sessions;
mod stats;
mod tickets;
mod util;

pub use util::map_sqlx_error;

use std::sync::Arc;

use sqlx::{
    postgres::{PgPool, PgPoolOptions},
    query,
};
use time::OffsetDateTime;

use crate::application::repos::{FeedScope, RepoError};

#[derive(Clone)]
pub struct PostgresRepositories {
    pool: Arc<PgPool>,
}

impl PostgresRepositories {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn connect(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
        PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(url)
            .await
    }

    pub async fn run_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
        sqlx::migrate!("./migrations")
            .run(pool)
            .await
            .map_err(Into::into)
    }

    pub async fn health_check(&self) -> Result<(), sqlx::Error> {
        query("SELECT 1").execute(self.pool()).await.map(|_| ())
    }

    fn scope_now(scope: &FeedScope) -> OffsetDateTime {
        scope.now.unwrap_or_else(OffsetDateTime::now_utc)
    }

    fn convert_count(value: i64) -> Result<u64, RepoError> {
        value
            .try_into()
            .map_err(|_| RepoError::from_persistence("count exceeds supported range"))
    }

    fn convert_limit(value: u64) -> i64 {
        i64::try_from(value).unwrap_or(i64::MAX)
    }
}
