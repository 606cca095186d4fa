use async_trait::async_trait;
use uuid::Uuid;

use crate::application::repos::{RepoError, SessionsRepo};
use crate::domain::viewer::{Viewer, ViewerProfile};

use super::{PostgresRepositories, map_sqlx_error};

#[derive(sqlx::FromRow)]
struct SessionProfileRow {
    id: i64,
    username: String,
    is_staff: bool,
    is_superuser: bool,
}

#[async_trait]
impl SessionsRepo for PostgresRepositories {
    /// Resolve a session token to a viewer. Unknown or expired tokens fall
    /// back to the anonymous viewer rather than erroring, so a stale
    /// cookie never breaks a public page.
    async fn viewer_by_token(&self, token: Uuid) -> Result<Viewer, RepoError> {
        let row: Option<SessionProfileRow> = sqlx::query_as(
            "SELECT pr.id, pr.username, pr.is_staff, pr.is_superuser \
             FROM sessions s \
             INNER JOIN profiles pr ON pr.id = s.profile_id \
             WHERE s.token = $1 AND s.expires_at > now()",
        )
        .bind(token)
        .fetch_optional(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let Some(row) = row else {
            return Ok(Viewer::anonymous());
        };

        let memberships: Vec<(i64, bool)> = sqlx::query_as(
            "SELECT organization_id, is_admin FROM organization_members \
             WHERE profile_id = $1 ORDER BY organization_id",
        )
        .bind(row.id)
        .fetch_all(self.pool())
        .await
        .map_err(map_sqlx_error)?;

        let organizations = memberships.iter().map(|(org, _)| *org).collect();
        let admin_of = memberships
            .iter()
            .filter(|(_, is_admin)| *is_admin)
            .map(|(org, _)| *org)
            .collect();

        Ok(Viewer::authenticated(ViewerProfile {
            id: row.id,
            username: row.username,
            is_staff: row.is_staff,
            is_superuser: row.is_superuser,
            organizations,
            admin_of,
        }))
    }
}
