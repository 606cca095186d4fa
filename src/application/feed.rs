//! Sidebar context shared by every feed page.

use std::sync::Arc;

use thiserror::Error;

use crate::application::pagination::PageError;
use crate::application::repos::{
    ContestWindow, ContestsRepo, FeedScope, OrganizationsRepo, ProfilesRepo, RepoError, StatsRepo,
};
use crate::domain::entities::{
    ClarificationRecord, ContestRecord, OrganizationRecord, ParticipationRecord, ProfileRecord,
    SiteCounts,
};
use crate::domain::viewer::Viewer;

const LEADERBOARD_SIZE: u64 = 10;
const RECENT_ORGANIZATIONS: u64 = 5;

#[derive(Debug, Error)]
pub enum FeedError {
    #[error("post not found")]
    PostNotFound,
    #[error(transparent)]
    Page(#[from] PageError),
    #[error(transparent)]
    Repo(#[from] RepoError),
}

/// Clarifications for the contest the viewer is currently taking part in.
#[derive(Debug, Clone)]
pub struct ContestClarifications {
    pub contest: ParticipationRecord,
    pub clarifications: Vec<ClarificationRecord>,
    pub can_edit_contest: bool,
}

impl ContestClarifications {
    pub fn has_clarifications(&self) -> bool {
        !self.clarifications.is_empty()
    }
}

#[derive(Debug, Clone)]
pub struct SidebarContext {
    pub counts: SiteCounts,
    pub current_contests: Vec<ContestRecord>,
    pub future_contests: Vec<ContestRecord>,
    pub top_rated: Vec<ProfileRecord>,
    pub top_scorers: Vec<ProfileRecord>,
    pub recent_organizations: Vec<OrganizationRecord>,
    pub contest_clarifications: Option<ContestClarifications>,
}

pub struct SidebarService {
    stats: Arc<dyn StatsRepo>,
    contests: Arc<dyn ContestsRepo>,
    profiles: Arc<dyn ProfilesRepo>,
    organizations: Arc<dyn OrganizationsRepo>,
}

impl SidebarService {
    pub fn new(
        stats: Arc<dyn StatsRepo>,
        contests: Arc<dyn ContestsRepo>,
        profiles: Arc<dyn ProfilesRepo>,
        organizations: Arc<dyn OrganizationsRepo>,
    ) -> Self {
        Self {
            stats,
            contests,
            profiles,
            organizations,
        }
    }

    pub async fn build(
        &self,
        viewer: &Viewer,
        scope: &FeedScope,
    ) -> Result<SidebarContext, FeedError> {
        let counts = self.stats.site_counts().await?;
        let current_contests = self.contests.list_visible(scope, ContestWindow::Current).await?;
        let future_contests = self.contests.list_visible(scope, ContestWindow::Future).await?;

        let top_rated = self
            .profiles
            .top_rated(scope.organization, LEADERBOARD_SIZE)
            .await?;
        let top_scorers = self
            .profiles
            .top_scorers(scope.organization, LEADERBOARD_SIZE)
            .await?;

        let recent_organizations = match viewer.profile_id() {
            Some(profile_id) => {
                self.organizations
                    .most_recent_for(profile_id, RECENT_ORGANIZATIONS)
                    .await?
            }
            None => Vec::new(),
        };

        let contest_clarifications = self.clarifications_for(viewer).await?;

        Ok(SidebarContext {
            counts,
            current_contests,
            future_contests,
            top_rated,
            top_scorers,
            recent_organizations,
            contest_clarifications,
        })
    }

    async fn clarifications_for(
        &self,
        viewer: &Viewer,
    ) -> Result<Option<ContestClarifications>, FeedError> {
        let Some(profile_id) = viewer.profile_id() else {
            return Ok(None);
        };
        let Some(contest) = self.contests.current_participation(profile_id).await? else {
            return Ok(None);
        };
        let clarifications = self.contests.clarifications(contest.contest_id).await?;
        let can_edit_contest = self
            .contests
            .is_editable_by(contest.contest_id, profile_id)
            .await?;
        Ok(Some(ContestClarifications {
            contest,
            clarifications,
            can_edit_contest,
        }))
    }
}
