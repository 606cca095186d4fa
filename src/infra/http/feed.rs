use std::sync::Arc;

use axum::{
    Extension, Router,
    extract::{Path, Query, State},
    http::StatusCode,
    middleware,
    response::{IntoResponse, Response},
    routing::get,
};
use metrics::counter;
use serde::Deserialize;
use time::OffsetDateTime;

use crate::{
    application::{
        comments::CommentFeedService,
        error::HttpError,
        feed::{FeedError, SidebarService},
        posts::PostFeedService,
        repos::{FeedScope, OrganizationsRepo, SessionsRepo},
        tickets::TicketFeedService,
    },
    domain::visibility::TicketFeedScope,
    infra::db::PostgresRepositories,
    presentation::views::{
        CommentFeedContext, CommentFeedTemplate, LayoutChrome, LayoutContext, OrganizationBadge,
        PostDetailContext, PostDetailTemplate, PostListContext, PostListTemplate, SidebarView,
        TicketFeedContext, TicketFeedTemplate, ViewerBadge, render_not_found_response,
        render_template_response,
    },
};

use super::{
    db_health_response,
    middleware::{RequestContext, log_responses, set_request_context},
};

#[derive(Clone)]
pub struct HttpState {
    pub posts: Arc<PostFeedService>,
    pub tickets: Arc<TicketFeedService>,
    pub comments: Arc<CommentFeedService>,
    pub sidebar: Arc<SidebarService>,
    pub sessions: Arc<dyn SessionsRepo>,
    pub organizations: Arc<dyn OrganizationsRepo>,
    pub db: Arc<PostgresRepositories>,
    pub site_domain: Arc<str>,
}

pub fn build_router(state: HttpState) -> Router {
    Router::new()
        .route("/", get(post_list))
        .route("/blog", get(post_list))
        .route("/post/{id}", get(post_detail))
        .route("/tickets", get(own_tickets))
        .route("/tickets/all", get(all_tickets))
        .route("/comments", get(comment_feed))
        .route("/_health/db", get(health))
        .layer(middleware::from_fn(log_responses))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            set_request_context,
        ))
        .with_state(state)
}

#[derive(Debug, Deserialize)]
#[serde(default)]
struct PageQuery {
    page: u32,
}

impl Default for PageQuery {
    fn default() -> Self {
        Self { page: 1 }
    }
}

fn feed_scope(ctx: &RequestContext) -> FeedScope {
    FeedScope::for_viewer(&ctx.viewer, ctx.organization.as_ref().map(|org| org.id))
}

async fn load_chrome(
    state: &HttpState,
    ctx: &RequestContext,
    scope: &FeedScope,
) -> Result<LayoutChrome, HttpError> {
    let sidebar = state
        .sidebar
        .build(&ctx.viewer, scope)
        .await
        .map_err(HttpError::from)?;
    Ok(LayoutChrome {
        title: String::new(),
        viewer: ViewerBadge::for_viewer(&ctx.viewer),
        organization: ctx.organization.as_ref().map(|org| OrganizationBadge {
            slug: org.slug.clone(),
            name: org.name.clone(),
        }),
        sidebar: SidebarView::from_context(&sidebar),
    })
}

fn feed_error_to_response(err: FeedError, chrome: LayoutChrome) -> Response {
    match err {
        FeedError::PostNotFound | FeedError::Page(_) => {
            counter!("gavel_feed_not_found_total").increment(1);
            render_not_found_response(chrome)
        }
        repo @ FeedError::Repo(_) => HttpError::from(repo).into_response(),
    }
}

async fn post_list(
    State(state): State<HttpState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<PageQuery>,
) -> Response {
    counter!("gavel_feed_requests_total").increment(1);
    let scope = feed_scope(&ctx);
    let chrome = match load_chrome(&state, &ctx, &scope).await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    match state.posts.list_page(&scope, query.page, None).await {
        Ok(page) => {
            let chrome = chrome.with_title(page.title.clone());
            let content = PostListContext::from_page(&page);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostListTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn post_detail(
    State(state): State<HttpState>,
    Extension(ctx): Extension<RequestContext>,
    Path(id): Path<i64>,
) -> Response {
    counter!("gavel_feed_requests_total").increment(1);
    let scope = feed_scope(&ctx);
    let chrome = match load_chrome(&state, &ctx, &scope).await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    match state
        .posts
        .post_detail(&ctx.viewer, id, OffsetDateTime::now_utc())
        .await
    {
        Ok(detail) => {
            let chrome = chrome.with_title(detail.post.title.clone());
            let content = PostDetailContext::from_detail(&detail);
            let view = LayoutContext::new(chrome, content);
            render_template_response(PostDetailTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn own_tickets(
    state: State<HttpState>,
    ctx: Extension<RequestContext>,
    query: Query<PageQuery>,
) -> Response {
    ticket_feed(state, ctx, query, TicketFeedScope::Own).await
}

async fn all_tickets(
    state: State<HttpState>,
    ctx: Extension<RequestContext>,
    query: Query<PageQuery>,
) -> Response {
    ticket_feed(state, ctx, query, TicketFeedScope::All).await
}

async fn ticket_feed(
    State(state): State<HttpState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<PageQuery>,
    scope: TicketFeedScope,
) -> Response {
    counter!("gavel_feed_requests_total").increment(1);
    let feed_scope = feed_scope(&ctx);
    let chrome = match load_chrome(&state, &ctx, &feed_scope).await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    match state.tickets.list_page(&ctx.viewer, scope, query.page).await {
        Ok(page) => {
            let content = TicketFeedContext::from_page(&page);
            let chrome = chrome.with_title(content.heading.clone());
            let view = LayoutContext::new(chrome, content);
            render_template_response(TicketFeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn comment_feed(
    State(state): State<HttpState>,
    Extension(ctx): Extension<RequestContext>,
    Query(query): Query<PageQuery>,
) -> Response {
    counter!("gavel_feed_requests_total").increment(1);
    let scope = feed_scope(&ctx);
    let chrome = match load_chrome(&state, &ctx, &scope).await {
        Ok(chrome) => chrome,
        Err(err) => return err.into_response(),
    };

    match state.comments.list_page(&scope, query.page).await {
        Ok(page) => {
            let chrome = chrome.with_title("Recent comments");
            let content = CommentFeedContext::from_page(&page);
            let view = LayoutContext::new(chrome, content);
            render_template_response(CommentFeedTemplate { view }, StatusCode::OK)
        }
        Err(err) => feed_error_to_response(err, chrome),
    }
}

async fn health(State(state): State<HttpState>) -> Response {
    db_health_response(state.db.health_check().await)
}
