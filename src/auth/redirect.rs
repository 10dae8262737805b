//! Where to send a user after they log in.
//!
//! Only paths on this site are accepted so that the log in page cannot be used
//! to bounce a user to another host.

use axum::{extract::Request, http::Uri};

use crate::endpoints;

/// A same-site path and query, e.g. "/ledger/income?month=2025-08".
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RedirectTarget(String);

impl RedirectTarget {
    /// Accept `raw_url` if it is a path on this site that is not an auth page.
    ///
    /// Absolute URLs are reduced to their path when `allow_absolute` is set,
    /// which is only the case for the URL htmx reports in `HX-Current-URL`.
    fn parse_inner(raw_url: &str, allow_absolute: bool) -> Option<Self> {
        let uri = raw_url.parse::<Uri>().ok()?;

        if !allow_absolute && (uri.scheme().is_some() || uri.authority().is_some()) {
            return None;
        }

        let path_and_query = uri.path_and_query()?.as_str();

        if !path_and_query.starts_with('/') || path_and_query.starts_with("//") {
            return None;
        }

        let path = path_and_query
            .split_once('?')
            .map_or(path_and_query, |(path, _)| path);

        if path == endpoints::LOG_IN_VIEW || path == endpoints::REGISTER_VIEW {
            return None;
        }

        Some(Self(path_and_query.to_owned()))
    }

    /// Accept a redirect URL submitted by the client, e.g. from the log in form.
    pub fn parse(raw_url: &str) -> Option<Self> {
        Self::parse_inner(raw_url, false)
    }

    /// The page the user was on when their request was rejected.
    ///
    /// Requests to `/api` routes come from htmx, so the page is read from the
    /// `HX-Current-URL` header rather than the request URI.
    pub fn from_request(request: &Request) -> Option<Self> {
        if !request.uri().path().starts_with("/api") {
            return request
                .uri()
                .path_and_query()
                .and_then(|path_and_query| Self::parse(path_and_query.as_str()));
        }

        let headers = request.headers();
        let is_hx_request = headers
            .get("hx-request")
            .and_then(|header| header.to_str().ok())
            .is_some_and(|header| header.eq_ignore_ascii_case("true"));

        if !is_hx_request {
            tracing::warn!("Missing HX-Request header for /api request.");
            return None;
        }

        let Some(current_url) = headers
            .get("hx-current-url")
            .and_then(|header| header.to_str().ok())
        else {
            tracing::warn!("Missing HX-Current-URL header for /api request.");
            return None;
        };

        let target = Self::parse_inner(current_url, true);
        if target.is_none() {
            tracing::warn!("Invalid HX-Current-URL header value: {current_url}");
        }

        target
    }

    /// The path and query to redirect to.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The URL of the log in page that sends the user here afterwards.
    pub fn log_in_url(&self) -> String {
        match serde_urlencoded::to_string([("redirect_url", self.as_str())]) {
            Ok(query) => format!("{}?{query}", endpoints::LOG_IN_VIEW),
            Err(error) => {
                tracing::error!("Could not encode redirect URL {}: {error}", self.0);
                endpoints::LOG_IN_VIEW.to_owned()
            }
        }
    }
}

/// The log in URL for a rejected request, falling back to the expenses page.
pub(crate) fn log_in_url_for(request: &Request) -> String {
    RedirectTarget::from_request(request)
        .unwrap_or_else(|| {
            tracing::warn!(
                "No usable redirect URL for {}. Falling back to the expenses page.",
                request.uri().path()
            );
            RedirectTarget(endpoints::EXPENSES_VIEW.to_owned())
        })
        .log_in_url()
}
