//! Recent-comments feed.

use std::sync::Arc;

use crate::application::feed::FeedError;
use crate::application::markdown::render_markdown;
use crate::application::page_titles::PageTitleCache;
use crate::application::pagination::{DiggPaginator, PageBounds};
use crate::application::repos::{CommentsRepo, FeedScope};
use crate::domain::entities::CommentRecord;

pub const COMMENTS_PER_PAGE: u64 = 50;

/// The feed only ever paginates over a bounded window of the newest
/// comments, not the whole table.
pub const COMMENT_WINDOW: u64 = 1000;

#[derive(Debug, Clone)]
pub struct CommentFeedEntry {
    pub comment: CommentRecord,
    pub body_html: String,
    /// Title of the commented-on page, when its target still exists.
    pub page_title: Option<String>,
}

#[derive(Debug, Clone)]
pub struct CommentFeedPage {
    pub entries: Vec<CommentFeedEntry>,
    pub bounds: PageBounds,
}

pub struct CommentFeedService {
    comments: Arc<dyn CommentsRepo>,
    paginator: DiggPaginator,
}

impl CommentFeedService {
    pub fn new(comments: Arc<dyn CommentsRepo>) -> Self {
        Self {
            comments,
            paginator: DiggPaginator::new(COMMENTS_PER_PAGE).body(6).padding(2),
        }
    }

    /// One page of the newest comments, scoped to the request's
    /// organization context. Pagination runs over the fetched window so a
    /// deep page never scans the full table. The title cache is scoped to
    /// this render: comments on the same page share one lookup, and
    /// retitled targets are fresh on the next request.
    pub async fn list_page(
        &self,
        scope: &FeedScope,
        number: u32,
    ) -> Result<CommentFeedPage, FeedError> {
        let window = self
            .comments
            .most_recent(COMMENT_WINDOW, scope.organization)
            .await?;

        let titles = PageTitleCache::new(self.comments.clone());
        let bounds = self.paginator.page(number, window.len() as u64)?;
        let mut entries = Vec::with_capacity(bounds.limit as usize);
        for comment in window
            .into_iter()
            .skip(bounds.offset as usize)
            .take(bounds.limit as usize)
        {
            let page_title = titles.get(&comment.page).await?;
            let body_html = render_markdown(&comment.body_markdown);
            entries.push(CommentFeedEntry {
                comment,
                body_html,
                page_title,
            });
        }

        Ok(CommentFeedPage { entries, bounds })
    }
}
