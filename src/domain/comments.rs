//! Comment page keys.
//!
//! Comments attach to arbitrary site pages through a string key. The feed
//! only ever aggregates blog keys, but title resolution understands the
//! other kinds too.

/// The kinds of pages comments attach to.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageKind {
    BlogPost(i64),
    Problem(String),
    Contest(String),
    Other(String),
}

pub const BLOG_PAGE_PREFIX: &str = "b:";

/// Page key for a blog post, `b:<id>`.
pub fn blog_page_key(post_id: i64) -> String {
    format!("{BLOG_PAGE_PREFIX}{post_id}")
}

/// Extract the post id from a `b:<id>` key.
pub fn blog_post_id(page: &str) -> Option<i64> {
    page.strip_prefix(BLOG_PAGE_PREFIX)?.parse().ok()
}

pub fn parse_page_key(page: &str) -> PageKind {
    if let Some(id) = blog_post_id(page) {
        return PageKind::BlogPost(id);
    }
    if let Some(code) = page.strip_prefix("p:") {
        return PageKind::Problem(code.to_string());
    }
    if let Some(key) = page.strip_prefix("c:") {
        return PageKind::Contest(key.to_string());
    }
    PageKind::Other(page.to_string())
}
