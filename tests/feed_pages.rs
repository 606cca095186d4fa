//! End-to-end feed behavior over in-memory repositories: visibility,
//! pagination, and template rendering, without a database.

use std::sync::Arc;

use async_trait::async_trait;
use time::OffsetDateTime;
use time::macros::datetime;

use gavel::application::comments::CommentFeedService;
use gavel::application::feed::FeedError;
use gavel::application::posts::{POSTS_PER_PAGE, PostFeedService};
use gavel::application::repos::{CommentsRepo, FeedScope, PostsRepo, RepoError};
use gavel::domain::entities::{BlogPostRecord, CommentRecord, OrganizationRecord, PostAuthor};
use gavel::domain::viewer::{Viewer, ViewerProfile};
use gavel::domain::visibility::post_visible_to;
use gavel::presentation::views::{
    LayoutChrome, LayoutContext, PostListContext, PostListTemplate, SidebarView, ViewerBadge,
    render_template,
};

fn now() -> OffsetDateTime {
    datetime!(2026-06-01 00:00 UTC)
}

fn member(id: i64, organizations: Vec<i64>) -> Viewer {
    Viewer::authenticated(ViewerProfile {
        id,
        username: format!("user{id}"),
        is_staff: false,
        is_superuser: false,
        organizations,
        admin_of: Vec::new(),
    })
}

fn post(id: i64, publish_on: OffsetDateTime) -> BlogPostRecord {
    BlogPostRecord {
        id,
        title: format!("Post {id}"),
        content_markdown: format!("Body of post {id}"),
        og_image: None,
        visible: true,
        sticky: false,
        publish_on,
        is_organization_private: false,
        authors: vec![PostAuthor {
            id: 1,
            username: "alice".into(),
        }],
        organizations: Vec::new(),
    }
}

struct MemoryPosts {
    posts: Vec<BlogPostRecord>,
}

impl MemoryPosts {
    fn visible_in(&self, scope: &FeedScope) -> Vec<BlogPostRecord> {
        let at = scope.now.unwrap_or_else(now);
        let viewer = match scope.profile_id {
            Some(id) => member(id, scope.viewer_organizations.clone()),
            None => Viewer::anonymous(),
        };
        let mut posts: Vec<_> = self
            .posts
            .iter()
            .filter(|post| post.visible && post.publish_on <= at)
            .filter(|post| post_visible_to(post, &viewer, at))
            .filter(|post| match scope.organization {
                Some(org) => post.organization_ids().any(|id| id == org),
                None => true,
            })
            .cloned()
            .collect();
        posts.sort_by(|a, b| {
            b.sticky
                .cmp(&a.sticky)
                .then(b.publish_on.cmp(&a.publish_on))
                .then(b.id.cmp(&a.id))
        });
        posts
    }
}

#[async_trait]
impl PostsRepo for MemoryPosts {
    async fn list_published(
        &self,
        scope: &FeedScope,
        offset: u64,
        limit: u64,
    ) -> Result<Vec<BlogPostRecord>, RepoError> {
        Ok(self
            .visible_in(scope)
            .into_iter()
            .skip(offset as usize)
            .take(limit as usize)
            .collect())
    }

    async fn count_published(&self, scope: &FeedScope) -> Result<u64, RepoError> {
        Ok(self.visible_in(scope).len() as u64)
    }

    async fn find_by_id(&self, id: i64) -> Result<Option<BlogPostRecord>, RepoError> {
        Ok(self.posts.iter().find(|post| post.id == id).cloned())
    }
}

struct MemoryComments {
    comments: Vec<CommentRecord>,
    titles: Vec<(String, String)>,
}

#[async_trait]
impl CommentsRepo for MemoryComments {
    async fn count_by_page(&self, pages: &[String]) -> Result<Vec<(String, i64)>, RepoError> {
        let mut counts = Vec::new();
        for page in pages {
            let count = self
                .comments
                .iter()
                .filter(|comment| !comment.hidden && comment.page == *page)
                .count() as i64;
            if count > 0 {
                counts.push((page.clone(), count));
            }
        }
        Ok(counts)
    }

    async fn most_recent(
        &self,
        limit: u64,
        _organization: Option<i64>,
    ) -> Result<Vec<CommentRecord>, RepoError> {
        let mut comments: Vec<_> = self
            .comments
            .iter()
            .filter(|comment| !comment.hidden)
            .cloned()
            .collect();
        comments.sort_by(|a, b| b.id.cmp(&a.id));
        comments.truncate(limit as usize);
        Ok(comments)
    }

    async fn page_title(&self, page: &str) -> Result<Option<String>, RepoError> {
        Ok(self
            .titles
            .iter()
            .find(|(key, _)| key == page)
            .map(|(_, title)| title.clone()))
    }
}

fn post_service(posts: Vec<BlogPostRecord>) -> PostFeedService {
    PostFeedService::new(
        Arc::new(MemoryPosts { posts }),
        Arc::new(MemoryComments {
            comments: Vec::new(),
            titles: Vec::new(),
        }),
    )
}

#[tokio::test]
async fn pagination_windows_partition_the_feed() {
    let posts: Vec<_> = (1..=35)
        .map(|id| post(id, datetime!(2026-01-01 00:00 UTC) + time::Duration::hours(id)))
        .collect();
    let service = post_service(posts);
    let scope = FeedScope::for_viewer(&Viewer::anonymous(), None).at(now());

    let mut seen = Vec::new();
    for number in 1..=4 {
        let page = service.list_page(&scope, number, None).await.unwrap();
        assert_eq!(page.title, format!("Page {number} of Posts"));
        assert!(page.posts.len() as u64 <= POSTS_PER_PAGE);
        seen.extend(page.posts.iter().map(|summary| summary.post.id));
    }

    // Every visible post appears exactly once across the pages.
    let mut sorted = seen.clone();
    sorted.sort_unstable();
    sorted.dedup();
    assert_eq!(sorted.len(), 35);
    assert_eq!(seen.len(), 35);

    assert!(matches!(
        service.list_page(&scope, 5, None).await,
        Err(FeedError::Page(_))
    ));
}

#[tokio::test]
async fn org_private_posts_show_only_to_members() {
    let mut private = post(2, datetime!(2026-01-02 00:00 UTC));
    private.is_organization_private = true;
    private.organizations = vec![OrganizationRecord {
        id: 9,
        slug: "club".into(),
        name: "The Club".into(),
    }];
    let service = post_service(vec![post(1, datetime!(2026-01-01 00:00 UTC)), private]);

    let outsider = member(50, vec![3]);
    let outsider_scope = FeedScope::for_viewer(&outsider, None).at(now());
    let page = service.list_page(&outsider_scope, 1, None).await.unwrap();
    let ids: Vec<i64> = page.posts.iter().map(|summary| summary.post.id).collect();
    assert_eq!(ids, vec![1]);

    let insider = member(51, vec![9]);
    let insider_scope = FeedScope::for_viewer(&insider, None).at(now());
    let page = service.list_page(&insider_scope, 1, None).await.unwrap();
    let ids: Vec<i64> = page.posts.iter().map(|summary| summary.post.id).collect();
    assert_eq!(ids, vec![2, 1]);

    // The same wall applies to the detail page, reported as not-found.
    assert!(matches!(
        service.post_detail(&outsider, 2, now()).await,
        Err(FeedError::PostNotFound)
    ));
    assert!(service.post_detail(&insider, 2, now()).await.is_ok());
}

#[tokio::test]
async fn organization_context_restricts_the_post_list() {
    let club = OrganizationRecord {
        id: 9,
        slug: "club".into(),
        name: "The Club".into(),
    };
    let mut club_post = post(2, datetime!(2026-01-02 00:00 UTC));
    club_post.organizations = vec![club.clone()];
    let mut club_private = post(3, datetime!(2026-01-03 00:00 UTC));
    club_private.is_organization_private = true;
    club_private.organizations = vec![club];
    let service = post_service(vec![
        post(1, datetime!(2026-01-01 00:00 UTC)),
        club_post,
        club_private,
    ]);

    // On the club subdomain a member sees only posts attached to the club.
    let insider = member(51, vec![9]);
    let club_scope = FeedScope::for_viewer(&insider, Some(9)).at(now());
    let page = service.list_page(&club_scope, 1, None).await.unwrap();
    let ids: Vec<i64> = page.posts.iter().map(|summary| summary.post.id).collect();
    assert_eq!(ids, vec![3, 2]);

    // The main site shows everything the same viewer may see.
    let main_scope = FeedScope::for_viewer(&insider, None).at(now());
    let page = service.list_page(&main_scope, 1, None).await.unwrap();
    let ids: Vec<i64> = page.posts.iter().map(|summary| summary.post.id).collect();
    assert_eq!(ids, vec![3, 2, 1]);
}

#[tokio::test]
async fn comment_feed_resolves_titles_through_the_cache() {
    let comments: Vec<_> = (1..=3)
        .map(|id| CommentRecord {
            id,
            page: "b:1".into(),
            author_id: 1,
            author_username: "alice".into(),
            body_markdown: "hello".into(),
            hidden: false,
            created_at: datetime!(2026-05-01 00:00 UTC),
        })
        .collect();
    let repo = Arc::new(MemoryComments {
        comments,
        titles: vec![("b:1".into(), "Welcome".into())],
    });
    let service = CommentFeedService::new(repo);

    let page = service.list_page(&FeedScope::default(), 1).await.unwrap();
    assert_eq!(page.entries.len(), 3);
    assert!(
        page.entries
            .iter()
            .all(|entry| entry.page_title.as_deref() == Some("Welcome"))
    );
}

#[tokio::test]
async fn post_list_page_renders_to_html() {
    let service = post_service(vec![post(1, datetime!(2026-01-01 00:00 UTC))]);
    let scope = FeedScope::for_viewer(&Viewer::anonymous(), None).at(now());
    let page = service.list_page(&scope, 1, None).await.unwrap();

    let chrome = LayoutChrome {
        title: page.title.clone(),
        viewer: ViewerBadge::for_viewer(&Viewer::anonymous()),
        organization: None,
        sidebar: SidebarView::default(),
    };
    let content = PostListContext::from_page(&page);
    let view = LayoutContext::new(chrome, content);

    let html = render_template(PostListTemplate { view })
        .expect("template renders")
        .0;
    assert!(html.contains("Page 1 of Posts"));
    assert!(html.contains("Post 1"));
    assert!(html.contains("/post/1"));
    assert!(html.contains("pagination"));
}
