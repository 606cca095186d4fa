//! Repository traits describing persistence adapters.
//!
//! The judge owns the schema; these traits expose exactly the read access
//! the feed pages need. Postgres implementations live in `infra::db`, and
//! the tests drive the services through in-memory fakes.

use async_trait::async_trait;
use thiserror::Error;
use time::OffsetDateTime;
use uuid::Uuid;

use crate::domain::entities::{
    BlogPostRecord, ClarificationRecord, CommentRecord, ContestRecord, OrganizationRecord,
    ParticipationRecord, ProfileRecord, SiteCounts, TicketRecord,
};
use crate::domain::viewer::Viewer;

#[derive(Debug, Error)]
pub enum RepoError {
    #[error("persistence error: {0}")]
    Persistence(String),
    #[error("resource not found")]
    NotFound,
    #[error("invalid input: {message}")]
    InvalidInput { message: String },
    #[error("database timeout")]
    Timeout,
}

impl RepoError {
    pub fn from_persistence(err: impl std::fmt::Display) -> Self {
        Self::Persistence(err.to_string())
    }
}

/// The filter a feed query runs under: who is asking, and which
/// organization context (subdomain) the request carries.
#[derive(Debug, Clone, Default)]
pub struct FeedScope {
    pub profile_id: Option<i64>,
    pub viewer_organizations: Vec<i64>,
    pub organization: Option<i64>,
    pub now: Option<OffsetDateTime>,
}

impl FeedScope {
    pub fn for_viewer(viewer: &Viewer, organization: Option<i64>) -> Self {
        Self {
            profile_id: viewer.profile_id(),
            viewer_organizations: viewer.organization_ids().to_vec(),
            organization,
            now: None,
        }
    }

    /// Pin the evaluation instant, mainly for tests; repositories default
    /// to their own clock when unset.
    pub fn at(mut self, now: OffsetDateTime) -> Self {
        self.now = Some(now);
        self
    }
}

/// Which half of the contest calendar a sidebar query wants.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContestWindow {
    /// start <= now < end
    Current,
    /// start > now
    Future,
}

#[async_trait]
pub trait PostsRepo: Send + Sync {
    /// Published, viewer-visible posts ordered sticky-first then newest,
    /// with authors and organizations attached.
    async fn list_published(
        &self,
        scope: &FeedScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<BlogPostRecord>, RepoError>;

    async fn count_published(&self, scope: &FeedScope) -> Result<u64, RepoError>;

    /// The raw post aggregate regardless of visibility; the caller applies
    /// the visibility predicate and 404s.
    async fn find_by_id(&self, id: i64) -> Result<Option<BlogPostRecord>, RepoError>;
}

#[async_trait]
pub trait CommentsRepo: Send + Sync {
    /// Non-hidden comment counts grouped by page key, one query for the
    /// whole page of posts.
    async fn count_by_page(&self, pages: &[String]) -> Result<Vec<(String, i64)>, RepoError>;

    /// Most recent non-hidden comments, optionally restricted to members
    /// of the given organization.
    async fn most_recent(
        &self,
        limit: u64,
        organization: Option<i64>,
    ) -> Result<Vec<CommentRecord>, RepoError>;

    /// Display title for a comment page key, when the target still exists.
    async fn page_title(&self, page: &str) -> Result<Option<String>, RepoError>;
}

#[async_trait]
pub trait TicketsRepo: Send + Sync {
    /// Open tickets owned by or assigned to the profile, newest first.
    async fn list_own_open(
        &self,
        profile_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TicketRecord>, RepoError>;

    async fn count_own_open(&self, profile_id: i64) -> Result<u64, RepoError>;

    /// Open tickets visible to the given staff profile (owner, assignee,
    /// or public linked item), newest first.
    async fn list_all_open(
        &self,
        profile_id: i64,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<TicketRecord>, RepoError>;

    async fn count_all_open(&self, profile_id: i64) -> Result<u64, RepoError>;
}

#[async_trait]
pub trait ProfilesRepo: Send + Sync {
    async fn top_rated(
        &self,
        organization: Option<i64>,
        limit: u64,
    ) -> Result<Vec<ProfileRecord>, RepoError>;

    async fn top_scorers(
        &self,
        organization: Option<i64>,
        limit: u64,
    ) -> Result<Vec<ProfileRecord>, RepoError>;
}

#[async_trait]
pub trait OrganizationsRepo: Send + Sync {
    async fn find_by_slug(&self, slug: &str) -> Result<Option<OrganizationRecord>, RepoError>;

    /// Organizations the profile visited most recently.
    async fn most_recent_for(
        &self,
        profile_id: i64,
        limit: u64,
    ) -> Result<Vec<OrganizationRecord>, RepoError>;
}

#[async_trait]
pub trait ContestsRepo: Send + Sync {
    /// Visible contests in the window, ordered by start time ascending.
    /// Under an organization context only that organization's private
    /// contests are returned.
    async fn list_visible(
        &self,
        scope: &FeedScope,
        window: ContestWindow,
    ) -> Result<Vec<ContestRecord>, RepoError>;

    async fn current_participation(
        &self,
        profile_id: i64,
    ) -> Result<Option<ParticipationRecord>, RepoError>;

    /// Clarifications for the contest's problems, newest first.
    async fn clarifications(&self, contest_id: i64)
    -> Result<Vec<ClarificationRecord>, RepoError>;

    /// Whether the profile authors or curates the contest.
    async fn is_editable_by(&self, contest_id: i64, profile_id: i64) -> Result<bool, RepoError>;
}

#[async_trait]
pub trait StatsRepo: Send + Sync {
    async fn site_counts(&self) -> Result<SiteCounts, RepoError>;
}

/// Session-token resolution used by the request-context middleware.
#[async_trait]
pub trait SessionsRepo: Send + Sync {
    async fn viewer_by_token(&self, token: Uuid) -> Result<Viewer, RepoError>;
}
