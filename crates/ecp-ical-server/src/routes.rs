//! HTTP routes.
//!
//! - `GET /cal` and `GET /cal/` - the untagged feed
//! - `GET /cal/{tags}` - the feed for a comma-separated tag list

use std::sync::Arc;

use axum::Router;
use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use ecp_ical_core::FeedQuery;
use tracing::error;

use crate::error::ServerError;
use crate::pipeline::FeedService;

/// Content type of feed responses.
pub const CALENDAR_CONTENT_TYPE: &str = "text/calendar; charset=utf-8";

/// Builds the feed router.
pub fn router(service: Arc<FeedService>) -> Router {
    Router::new()
        .route("/cal", get(untagged_feed))
        .route("/cal/", get(untagged_feed))
        .route("/cal/{tags}", get(tagged_feed))
        .with_state(service)
}

/// Maps pipeline errors to HTTP responses.
pub struct AppError(ServerError);

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = if self.0.is_upstream() {
            StatusCode::BAD_GATEWAY
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        error!(status = %status, error = %self.0, "Feed request failed");
        (status, self.0.to_string()).into_response()
    }
}

impl From<ServerError> for AppError {
    fn from(err: ServerError) -> Self {
        Self(err)
    }
}

/// GET /cal
async fn untagged_feed(
    State(service): State<Arc<FeedService>>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    feed(&service, None, &headers, &uri).await
}

/// GET /cal/{tags}
async fn tagged_feed(
    State(service): State<Arc<FeedService>>,
    Path(tags): Path<String>,
    headers: HeaderMap,
    uri: Uri,
) -> Result<Response, AppError> {
    feed(&service, Some(&tags), &headers, &uri).await
}

async fn feed(
    service: &FeedService,
    tags: Option<&str>,
    headers: &HeaderMap,
    uri: &Uri,
) -> Result<Response, AppError> {
    let query = FeedQuery::parse(tags);
    let body = service.render(&query, &request_url(headers, uri)).await?;
    Ok(([(header::CONTENT_TYPE, CALENDAR_CONTENT_TYPE)], body).into_response())
}

/// Reconstructs the URL the subscriber used.
fn request_url(headers: &HeaderMap, uri: &Uri) -> String {
    if uri.scheme().is_some() && uri.authority().is_some() {
        return uri.to_string();
    }
    let host = headers
        .get(header::HOST)
        .and_then(|value| value.to_str().ok())
        .unwrap_or("localhost");
    let scheme = headers
        .get("x-forwarded-proto")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("http");
    format!("{scheme}://{host}{uri}")
}
