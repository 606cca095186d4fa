//! Blog post list and detail services.

use std::collections::HashMap;
use std::sync::Arc;

use time::OffsetDateTime;

use crate::application::feed::FeedError;
use crate::application::markdown::render_markdown;
use crate::application::pagination::{DiggPaginator, PageBounds};
use crate::application::repos::{CommentsRepo, FeedScope, PostsRepo};
use crate::domain::comments::blog_page_key;
use crate::domain::entities::BlogPostRecord;
use crate::domain::viewer::Viewer;
use crate::domain::visibility::{EditEligibility, post_edit_eligibility, post_visible_to};

pub const POSTS_PER_PAGE: u64 = 10;

/// One post on the list page: the record, its rendered body, and its
/// comment count.
#[derive(Debug, Clone)]
pub struct PostSummary {
    pub post: BlogPostRecord,
    pub content_html: String,
    pub comment_count: i64,
}

#[derive(Debug, Clone)]
pub struct PostListPage {
    pub title: String,
    pub posts: Vec<PostSummary>,
    pub bounds: PageBounds,
}

#[derive(Debug, Clone)]
pub struct PostDetail {
    pub post: BlogPostRecord,
    pub content_html: String,
    pub comment_count: i64,
    pub eligibility: EditEligibility,
}

pub struct PostFeedService {
    posts: Arc<dyn PostsRepo>,
    comments: Arc<dyn CommentsRepo>,
    paginator: DiggPaginator,
}

impl PostFeedService {
    pub fn new(posts: Arc<dyn PostsRepo>, comments: Arc<dyn CommentsRepo>) -> Self {
        Self {
            posts,
            comments,
            paginator: DiggPaginator::new(POSTS_PER_PAGE).body(6).padding(2),
        }
    }

    /// One page of the published-post feed, scoped to the viewer and the
    /// request's organization context.
    pub async fn list_page(
        &self,
        scope: &FeedScope,
        number: u32,
        title: Option<String>,
    ) -> Result<PostListPage, FeedError> {
        let total = self.posts.count_published(scope).await?;
        let bounds = self.paginator.page(number, total)?;
        let records = self
            .posts
            .list_published(scope, bounds.offset, bounds.limit)
            .await?;

        // One aggregate query covers the comment counts for the page.
        let pages: Vec<String> = records.iter().map(|post| blog_page_key(post.id)).collect();
        let counts: HashMap<String, i64> = self
            .comments
            .count_by_page(&pages)
            .await?
            .into_iter()
            .collect();

        let posts = records
            .into_iter()
            .map(|post| {
                let comment_count = counts
                    .get(&blog_page_key(post.id))
                    .copied()
                    .unwrap_or_default();
                let content_html = render_markdown(&post.content_markdown);
                PostSummary {
                    post,
                    content_html,
                    comment_count,
                }
            })
            .collect();

        let title = title.unwrap_or_else(|| format!("Page {number} of Posts"));

        Ok(PostListPage {
            title,
            posts,
            bounds,
        })
    }

    /// A single post, or `PostNotFound` for anything the viewer may not
    /// see. Missing and invisible posts are indistinguishable on purpose.
    pub async fn post_detail(
        &self,
        viewer: &Viewer,
        id: i64,
        now: OffsetDateTime,
    ) -> Result<PostDetail, FeedError> {
        let post = self
            .posts
            .find_by_id(id)
            .await?
            .ok_or(FeedError::PostNotFound)?;
        if !post_visible_to(&post, viewer, now) {
            return Err(FeedError::PostNotFound);
        }

        let eligibility = post_edit_eligibility(&post, viewer);
        let page = blog_page_key(post.id);
        let comment_count = self
            .comments
            .count_by_page(std::slice::from_ref(&page))
            .await?
            .into_iter()
            .find(|(key, _)| *key == page)
            .map(|(_, count)| count)
            .unwrap_or_default();

        let content_html = render_markdown(&post.content_markdown);

        Ok(PostDetail {
            post,
            content_html,
            comment_count,
            eligibility,
        })
    }
}
