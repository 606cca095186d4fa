use askama::{Error as AskamaError, Template};
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use thiserror::Error;
use time::{OffsetDateTime, format_description::BorrowedFormatItem, macros::format_description};

use crate::application::comments::CommentFeedPage;
use crate::application::error::{ErrorReport, HttpError};
use crate::application::feed::SidebarContext;
use crate::application::pagination::{PageBounds, PageMark};
use crate::application::posts::{PostDetail, PostListPage};
use crate::application::tickets::TicketFeedPage;
use crate::domain::viewer::Viewer;
use crate::domain::visibility::TicketFeedScope;

#[derive(Debug, Error)]
#[error("{public_message}")]
pub struct TemplateRenderError {
    pub(crate) source: &'static str,
    pub(crate) public_message: &'static str,
    #[source]
    pub(crate) error: AskamaError,
}

impl TemplateRenderError {
    pub fn new(source: &'static str, public_message: &'static str, error: AskamaError) -> Self {
        Self {
            source,
            public_message,
            error,
        }
    }
}

impl From<TemplateRenderError> for HttpError {
    fn from(err: TemplateRenderError) -> Self {
        let TemplateRenderError {
            source,
            public_message,
            error,
        } = err;

        HttpError::from_error(
            source,
            StatusCode::INTERNAL_SERVER_ERROR,
            public_message,
            &error,
        )
    }
}

pub fn render_template<T: Template>(template: T) -> Result<Html<String>, HttpError> {
    template.render().map(Html).map_err(|err| {
        TemplateRenderError::new(
            "presentation::views::render_template",
            "Template rendering failed",
            err,
        )
        .into()
    })
}

pub fn render_template_response<T: Template>(template: T, status: StatusCode) -> Response {
    match render_template(template) {
        Ok(html) => (status, html).into_response(),
        Err(err) => err.into_response(),
    }
}

pub fn render_not_found_response(chrome: LayoutChrome) -> Response {
    let content = ErrorPageView::not_found();
    let view = LayoutContext::new(chrome, content);
    let mut response = render_template_response(ErrorTemplate { view }, StatusCode::NOT_FOUND);
    ErrorReport::from_message(
        "presentation::views::render_not_found_response",
        StatusCode::NOT_FOUND,
        "Resource not found",
    )
    .attach(&mut response);
    response
}

const DATE_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year]");
const DATETIME_FORMAT: &[BorrowedFormatItem<'static>] =
    format_description!("[month repr:short] [day padding:none], [year] [hour]:[minute]");

pub fn format_date(moment: OffsetDateTime) -> String {
    moment
        .format(&DATE_FORMAT)
        .unwrap_or_else(|_| moment.date().to_string())
}

pub fn format_datetime(moment: OffsetDateTime) -> String {
    moment
        .format(&DATETIME_FORMAT)
        .unwrap_or_else(|_| moment.to_string())
}

/// Who is looking at the page, as the header renders it.
#[derive(Clone)]
pub struct ViewerBadge {
    pub username: Option<String>,
    pub is_staff: bool,
}

impl ViewerBadge {
    pub fn for_viewer(viewer: &Viewer) -> Self {
        Self {
            username: viewer.profile().map(|profile| profile.username.clone()),
            is_staff: viewer.is_staff(),
        }
    }
}

/// The organization context the request arrived under, when any.
#[derive(Clone)]
pub struct OrganizationBadge {
    pub slug: String,
    pub name: String,
}

#[derive(Clone)]
pub struct ContestCard {
    pub key: String,
    pub name: String,
    pub starts: String,
    pub ends: String,
}

#[derive(Clone)]
pub struct RankedUser {
    pub rank: usize,
    pub username: String,
    pub score: String,
}

#[derive(Clone)]
pub struct ClarificationCard {
    pub problem_code: String,
    pub problem_name: String,
    pub body: String,
    pub date: String,
}

#[derive(Clone)]
pub struct OrganizationLink {
    pub slug: String,
    pub name: String,
}

#[derive(Clone, Default)]
pub struct SidebarView {
    pub user_count: i64,
    pub problem_count: i64,
    pub submission_count: i64,
    pub language_count: i64,
    pub current_contests: Vec<ContestCard>,
    pub future_contests: Vec<ContestCard>,
    pub top_rated: Vec<RankedUser>,
    pub top_scorers: Vec<RankedUser>,
    pub recent_organizations: Vec<OrganizationLink>,
    pub clarification_contest: Option<String>,
    pub clarifications: Vec<ClarificationCard>,
    pub can_edit_contest: bool,
}

impl SidebarView {
    pub fn from_context(context: &SidebarContext) -> Self {
        let contest_card = |contest: &crate::domain::entities::ContestRecord| ContestCard {
            key: contest.key.clone(),
            name: contest.name.clone(),
            starts: format_datetime(contest.start_time),
            ends: format_datetime(contest.end_time),
        };

        let rated = context
            .top_rated
            .iter()
            .enumerate()
            .map(|(index, profile)| RankedUser {
                rank: index + 1,
                username: profile.username.clone(),
                score: profile
                    .rating
                    .map(|rating| rating.to_string())
                    .unwrap_or_default(),
            })
            .collect();
        let scorers = context
            .top_scorers
            .iter()
            .enumerate()
            .map(|(index, profile)| RankedUser {
                rank: index + 1,
                username: profile.username.clone(),
                score: format!("{:.0}", profile.performance_points),
            })
            .collect();

        let (clarification_contest, clarifications, can_edit_contest) =
            match &context.contest_clarifications {
                Some(block) => (
                    Some(block.contest.contest_name.clone()),
                    block
                        .clarifications
                        .iter()
                        .map(|clarification| ClarificationCard {
                            problem_code: clarification.problem_code.clone(),
                            problem_name: clarification.problem_name.clone(),
                            body: clarification.body.clone(),
                            date: format_datetime(clarification.date),
                        })
                        .collect(),
                    block.can_edit_contest,
                ),
                None => (None, Vec::new(), false),
            };

        Self {
            user_count: context.counts.users,
            problem_count: context.counts.problems,
            submission_count: context.counts.submissions,
            language_count: context.counts.languages,
            current_contests: context.current_contests.iter().map(contest_card).collect(),
            future_contests: context.future_contests.iter().map(contest_card).collect(),
            top_rated: rated,
            top_scorers: scorers,
            recent_organizations: context
                .recent_organizations
                .iter()
                .map(|org| OrganizationLink {
                    slug: org.slug.clone(),
                    name: org.name.clone(),
                })
                .collect(),
            clarification_contest,
            clarifications,
            can_edit_contest,
        }
    }
}

#[derive(Clone)]
pub struct LayoutChrome {
    pub title: String,
    pub viewer: ViewerBadge,
    pub organization: Option<OrganizationBadge>,
    pub sidebar: SidebarView,
}

impl LayoutChrome {
    pub fn with_title(self, title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            ..self
        }
    }
}

pub struct LayoutContext<T> {
    pub title: String,
    pub viewer: ViewerBadge,
    pub organization: Option<OrganizationBadge>,
    pub sidebar: SidebarView,
    pub content: T,
}

impl<T> LayoutContext<T> {
    pub fn new(chrome: LayoutChrome, content: T) -> Self {
        Self {
            title: chrome.title,
            viewer: chrome.viewer,
            organization: chrome.organization,
            sidebar: chrome.sidebar,
            content,
        }
    }
}

/// One entry of the digg page-range widget. A missing number is a gap
/// marker.
pub struct PageLink {
    pub number: Option<u32>,
    pub is_current: bool,
}

pub struct PaginationView {
    pub links: Vec<PageLink>,
    pub previous: Option<u32>,
    pub next: Option<u32>,
}

impl PaginationView {
    pub fn from_bounds(bounds: &PageBounds) -> Self {
        let links = bounds
            .marks
            .iter()
            .map(|mark| match mark {
                PageMark::Number(number) => PageLink {
                    number: Some(*number),
                    is_current: *number == bounds.number,
                },
                PageMark::Gap => PageLink {
                    number: None,
                    is_current: false,
                },
            })
            .collect();
        Self {
            links,
            previous: bounds.has_previous().then(|| bounds.number - 1),
            next: bounds.has_next().then(|| bounds.number + 1),
        }
    }
}

pub struct PostCard {
    pub id: i64,
    pub title: String,
    pub authors: Vec<String>,
    pub published: String,
    pub sticky: bool,
    pub content_html: String,
    pub comment_count: i64,
}

pub struct PostListContext {
    pub heading: String,
    pub posts: Vec<PostCard>,
    pub pagination: PaginationView,
}

impl PostListContext {
    pub fn from_page(page: &PostListPage) -> Self {
        Self {
            heading: page.title.clone(),
            posts: page
                .posts
                .iter()
                .map(|summary| PostCard {
                    id: summary.post.id,
                    title: summary.post.title.clone(),
                    authors: summary
                        .post
                        .authors
                        .iter()
                        .map(|author| author.username.clone())
                        .collect(),
                    published: format_date(summary.post.publish_on),
                    sticky: summary.post.sticky,
                    content_html: summary.content_html.clone(),
                    comment_count: summary.comment_count,
                })
                .collect(),
            pagination: PaginationView::from_bounds(&page.bounds),
        }
    }
}

#[derive(Template)]
#[template(path = "post_list.html")]
pub struct PostListTemplate {
    pub view: LayoutContext<PostListContext>,
}

pub struct PostDetailContext {
    pub id: i64,
    pub title: String,
    pub authors: Vec<String>,
    pub published: String,
    pub content_html: String,
    pub comment_count: i64,
    pub og_image: Option<String>,
    pub can_edit: bool,
    pub editable_organizations: Vec<OrganizationLink>,
}

impl PostDetailContext {
    pub fn from_detail(detail: &PostDetail) -> Self {
        let editable_organizations = detail
            .post
            .organizations
            .iter()
            .filter(|org| detail.eligibility.editable_organizations.contains(&org.id))
            .map(|org| OrganizationLink {
                slug: org.slug.clone(),
                name: org.name.clone(),
            })
            .collect();
        Self {
            id: detail.post.id,
            title: detail.post.title.clone(),
            authors: detail
                .post
                .authors
                .iter()
                .map(|author| author.username.clone())
                .collect(),
            published: format_date(detail.post.publish_on),
            content_html: detail.content_html.clone(),
            comment_count: detail.comment_count,
            og_image: detail.post.og_image.clone(),
            can_edit: detail.eligibility.can_edit,
            editable_organizations,
        }
    }
}

#[derive(Template)]
#[template(path = "post_detail.html")]
pub struct PostDetailTemplate {
    pub view: LayoutContext<PostDetailContext>,
}

pub struct TicketRow {
    pub id: i64,
    pub title: String,
    pub owner: String,
    pub created: String,
    pub linked_label: Option<String>,
    pub linked_url: Option<String>,
}

pub struct TicketFeedContext {
    pub heading: String,
    pub tickets: Vec<TicketRow>,
    pub pagination: PaginationView,
}

impl TicketFeedContext {
    pub fn from_page(page: &TicketFeedPage) -> Self {
        let heading = match page.scope {
            TicketFeedScope::Own => "Your Tickets".to_string(),
            TicketFeedScope::All => "Open Tickets".to_string(),
        };
        Self {
            heading,
            tickets: page
                .tickets
                .iter()
                .map(|ticket| TicketRow {
                    id: ticket.id,
                    title: ticket.title.clone(),
                    owner: ticket.owner_username.clone(),
                    created: format_datetime(ticket.created_at),
                    linked_label: ticket.linked_item.as_ref().map(|link| link.label.clone()),
                    linked_url: ticket.linked_item.as_ref().map(|link| link.url.clone()),
                })
                .collect(),
            pagination: PaginationView::from_bounds(&page.bounds),
        }
    }
}

#[derive(Template)]
#[template(path = "ticket_feed.html")]
pub struct TicketFeedTemplate {
    pub view: LayoutContext<TicketFeedContext>,
}

pub struct CommentEntry {
    pub author: String,
    pub page_title: String,
    pub body_html: String,
    pub created: String,
}

pub struct CommentFeedContext {
    pub entries: Vec<CommentEntry>,
    pub pagination: PaginationView,
}

impl CommentFeedContext {
    pub fn from_page(page: &CommentFeedPage) -> Self {
        Self {
            entries: page
                .entries
                .iter()
                .map(|entry| CommentEntry {
                    author: entry.comment.author_username.clone(),
                    page_title: entry
                        .page_title
                        .clone()
                        .unwrap_or_else(|| entry.comment.page.clone()),
                    body_html: entry.body_html.clone(),
                    created: format_datetime(entry.comment.created_at),
                })
                .collect(),
            pagination: PaginationView::from_bounds(&page.bounds),
        }
    }
}

#[derive(Template)]
#[template(path = "comment_feed.html")]
pub struct CommentFeedTemplate {
    pub view: LayoutContext<CommentFeedContext>,
}

pub struct ErrorPageView {
    pub title: String,
    pub message: String,
}

impl ErrorPageView {
    pub fn not_found() -> Self {
        Self {
            title: "Page Not Found".to_string(),
            message: "The page you requested does not exist.".to_string(),
        }
    }
}

#[derive(Template)]
#[template(path = "error.html")]
pub struct ErrorTemplate {
    pub view: LayoutContext<ErrorPageView>,
}
