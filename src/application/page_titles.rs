//! Lazy page-key to title resolution for the comment feed.

use std::sync::Arc;

use dashmap::DashMap;
use metrics::counter;

use crate::application::repos::{CommentsRepo, RepoError};

/// Resolves comment page keys (`b:<id>`, `p:<code>`, ...) to display
/// titles, loading each key at most once per cache. A cache lives for a
/// single page render, so retitled or deleted targets show up on the next
/// request.
pub struct PageTitleCache {
    titles: DashMap<String, Option<String>>,
    comments: Arc<dyn CommentsRepo>,
}

impl PageTitleCache {
    pub fn new(comments: Arc<dyn CommentsRepo>) -> Self {
        Self {
            titles: DashMap::new(),
            comments,
        }
    }

    /// The title for `page`, or None when the commented-on object no
    /// longer exists. Missing keys are cached too so a deleted target is
    /// queried at most once per render.
    pub async fn get(&self, page: &str) -> Result<Option<String>, RepoError> {
        if let Some(cached) = self.titles.get(page) {
            return Ok(cached.clone());
        }
        counter!("gavel_page_title_lookup_total").increment(1);
        let title = self.comments.page_title(page).await?;
        self.titles.insert(page.to_owned(), title.clone());
        Ok(title)
    }
}
