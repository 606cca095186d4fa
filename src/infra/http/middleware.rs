use std::time::Instant;

use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use metrics::histogram;
use tracing::{error, warn};
use uuid::Uuid;

use crate::application::error::ErrorReport;
use crate::domain::entities::OrganizationRecord;
use crate::domain::viewer::Viewer;

use super::HttpState;

pub const SESSION_COOKIE: &str = "gavel_session";

/// Per-request identity and scoping, attached as a request extension.
#[derive(Clone)]
pub struct RequestContext {
    pub request_id: String,
    pub viewer: Viewer,
    pub organization: Option<OrganizationRecord>,
}

fn session_token(request: &Request<Body>) -> Option<Uuid> {
    let cookies = request.headers().get(header::COOKIE)?.to_str().ok()?;
    cookies.split(';').find_map(|cookie| {
        let (name, value) = cookie.trim().split_once('=')?;
        if name == SESSION_COOKIE {
            Uuid::parse_str(value.trim()).ok()
        } else {
            None
        }
    })
}

/// Subdomain of the configured site domain, if the request carries one.
fn organization_slug<'a>(request: &'a Request<Body>, site_domain: &str) -> Option<&'a str> {
    let host = request.headers().get(header::HOST)?.to_str().ok()?;
    let host = host.split(':').next()?;
    let slug = host.strip_suffix(site_domain)?.strip_suffix('.')?;
    if slug.is_empty() || slug == "www" || slug.contains('.') {
        return None;
    }
    Some(slug)
}

/// Resolve the viewer and organization context for the request. A broken
/// session or unknown subdomain degrades to anonymous on the main site;
/// public pages must keep working when the database cannot say who is
/// asking.
pub async fn set_request_context(
    State(state): State<HttpState>,
    mut request: Request<Body>,
    next: Next,
) -> Response {
    let viewer = match session_token(&request) {
        Some(token) => match state.sessions.viewer_by_token(token).await {
            Ok(viewer) => viewer,
            Err(err) => {
                warn!(
                    target = "gavel::http::session",
                    error = %err,
                    "session lookup failed, treating request as anonymous"
                );
                Viewer::anonymous()
            }
        },
        None => Viewer::anonymous(),
    };

    let organization = match organization_slug(&request, &state.site_domain) {
        Some(slug) => match state.organizations.find_by_slug(slug).await {
            Ok(organization) => organization,
            Err(err) => {
                warn!(
                    target = "gavel::http::organization",
                    slug = slug,
                    error = %err,
                    "organization lookup failed, serving the main site"
                );
                None
            }
        },
        None => None,
    };

    let ctx = RequestContext {
        request_id: Uuid::new_v4().to_string(),
        viewer,
        organization,
    };
    request.extensions_mut().insert(ctx.clone());

    let mut response = next.run(request).await;
    response.extensions_mut().insert(ctx);
    response
}

pub async fn log_responses(request: Request<Body>, next: Next) -> Response {
    let method = request.method().clone();
    let uri = request.uri().clone();
    let start = Instant::now();

    let request_id = request
        .extensions()
        .get::<RequestContext>()
        .map(|ctx| ctx.request_id.clone())
        .unwrap_or_default();

    let mut response = next.run(request).await;
    let status = response.status();
    let elapsed_ms = start.elapsed().as_millis();
    histogram!("gavel_feed_render_ms").record(elapsed_ms as f64);

    if status.is_client_error() || status.is_server_error() {
        let report = response.extensions_mut().remove::<ErrorReport>();
        let (source, messages) = match report {
            Some(report) => (report.source, report.messages),
            None => ("unknown", Vec::new()),
        };
        let detail = messages
            .first()
            .cloned()
            .unwrap_or_else(|| "no diagnostic available".to_string());

        if status.is_server_error() {
            error!(
                target = "gavel::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "request failed",
            );
        } else {
            warn!(
                target = "gavel::http::response",
                status = status.as_u16(),
                method = %method,
                path = %uri.path(),
                query = uri.query().unwrap_or(""),
                elapsed_ms = elapsed_ms,
                source = source,
                detail = %detail,
                chain = ?messages,
                request_id = request_id,
                "client request error",
            );
        }
    }

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request_with(header_name: header::HeaderName, value: &str) -> Request<Body> {
        Request::builder()
            .header(header_name, value)
            .body(Body::empty())
            .expect("request")
    }

    #[test]
    fn session_cookie_is_extracted_among_others() {
        let token = Uuid::new_v4();
        let request = request_with(
            header::COOKIE,
            &format!("theme=dark; gavel_session={token}; lang=en"),
        );
        assert_eq!(session_token(&request), Some(token));
    }

    #[test]
    fn malformed_session_cookie_is_ignored() {
        let request = request_with(header::COOKIE, "gavel_session=not-a-uuid");
        assert_eq!(session_token(&request), None);
    }

    #[test]
    fn subdomain_resolves_against_the_site_domain() {
        let request = request_with(header::HOST, "acm.judge.example:8080");
        assert_eq!(organization_slug(&request, "judge.example"), Some("acm"));

        let bare = request_with(header::HOST, "judge.example");
        assert_eq!(organization_slug(&bare, "judge.example"), None);

        let www = request_with(header::HOST, "www.judge.example");
        assert_eq!(organization_slug(&www, "judge.example"), None);

        let other = request_with(header::HOST, "evil.com");
        assert_eq!(organization_slug(&other, "judge.example"), None);
    }
}
