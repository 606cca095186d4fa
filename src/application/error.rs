use std::error::Error as StdError;

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
};
use thiserror::Error;

use crate::{application::feed::FeedError, infra::error::InfraError};

/// Diagnostic detail attached to error responses so the logging middleware
/// can report the cause chain without leaking it to the client.
#[derive(Debug, Clone)]
pub struct ErrorReport {
    pub source: &'static str,
    pub status: StatusCode,
    pub messages: Vec<String>,
}

impl ErrorReport {
    pub fn from_error(source: &'static str, status: StatusCode, error: &dyn StdError) -> Self {
        let mut messages = Vec::new();
        messages.push(error.to_string());
        let mut current = error.source();
        while let Some(inner) = current {
            messages.push(inner.to_string());
            current = inner.source();
        }
        Self {
            source,
            status,
            messages,
        }
    }

    pub fn from_message(
        source: &'static str,
        status: StatusCode,
        message: impl Into<String>,
    ) -> Self {
        Self {
            source,
            status,
            messages: vec![message.into()],
        }
    }

    pub fn attach(self, response: &mut Response) {
        response.extensions_mut().insert(self);
    }
}

/// What a failed handler sends back: a terse public message plus a
/// diagnostic report stashed in the response extensions.
#[derive(Debug)]
pub struct HttpError {
    status: StatusCode,
    public_message: &'static str,
    report: ErrorReport,
}

impl HttpError {
    pub fn new(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        detail: impl Into<String>,
    ) -> Self {
        let report = ErrorReport::from_message(source, status, detail);
        Self {
            status,
            public_message,
            report,
        }
    }

    pub fn from_error(
        source: &'static str,
        status: StatusCode,
        public_message: &'static str,
        error: &dyn StdError,
    ) -> Self {
        let report = ErrorReport::from_error(source, status, error);
        Self {
            status,
            public_message,
            report,
        }
    }
}

impl IntoResponse for HttpError {
    fn into_response(self) -> Response {
        let mut response = (self.status, self.public_message).into_response();
        self.report.attach(&mut response);
        response
    }
}

impl From<FeedError> for HttpError {
    fn from(error: FeedError) -> Self {
        const SOURCE: &str = "application::error::feed_error_to_http_error";
        match error {
            // Invisible content and out-of-range pages both read as
            // not-found, never as permission-denied.
            FeedError::PostNotFound => HttpError::new(
                SOURCE,
                StatusCode::NOT_FOUND,
                "Post not found",
                "post does not exist or is not visible to the viewer",
            ),
            FeedError::Page(err) => {
                HttpError::from_error(SOURCE, StatusCode::NOT_FOUND, "Page not found", &err)
            }
            FeedError::Repo(err) => HttpError::from_error(
                SOURCE,
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal server error",
                &err,
            ),
        }
    }
}

/// Startup failures reported from `main`. Request-path errors become
/// `HttpError` responses instead.
#[derive(Debug, Error)]
pub enum AppError {
    #[error(transparent)]
    Infra(#[from] InfraError),
    #[error("unexpected error: {0}")]
    Unexpected(String),
}

impl AppError {
    pub fn unexpected(message: impl Into<String>) -> Self {
        Self::Unexpected(message.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::pagination::PageError;
    use crate::application::repos::RepoError;

    fn status_of(error: FeedError) -> StatusCode {
        HttpError::from(error).into_response().status()
    }

    #[test]
    fn hidden_posts_and_bad_pages_answer_not_found() {
        assert_eq!(status_of(FeedError::PostNotFound), StatusCode::NOT_FOUND);
        assert_eq!(
            status_of(FeedError::Page(PageError::PastRange { number: 9, last: 2 })),
            StatusCode::NOT_FOUND
        );
    }

    #[test]
    fn repository_failures_answer_internal_error() {
        assert_eq!(
            status_of(FeedError::Repo(RepoError::Timeout)),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn reports_carry_the_cause_chain() {
        let response = HttpError::from(FeedError::Repo(RepoError::from_persistence(
            "connection reset",
        )))
        .into_response();
        let report = response
            .extensions()
            .get::<ErrorReport>()
            .expect("report attached");
        assert_eq!(report.status, StatusCode::INTERNAL_SERVER_ERROR);
        assert!(report.messages[0].contains("connection reset"));
    }
}
