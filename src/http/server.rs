//! HTTP applications for the three endpoints.
//!
//! # Responsibilities
//! - Plain-HTTP app: virtual host dispatch
//! - TLS app: virtual host dispatch plus security headers
//! - Redirector app: permanent redirect to the HTTPS origin
//!
//! # Design Decisions
//! - Every app is an axum `Router` with a single fallback handler; routing is by host, not path
//! - Security headers are only layered onto the TLS app

use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderValue, Request, StatusCode},
    response::{IntoResponse, Response},
    Router,
};
use tower_http::trace::TraceLayer;

use crate::observability::metrics;
use crate::routing::router::request_host;
use crate::routing::VirtualHostRouter;
use crate::security::SecurityHeaders;

/// App serving the virtual hosts over plain HTTP.
pub fn vhost_app(router: Arc<VirtualHostRouter>) -> Router {
    Router::new()
        .fallback(dispatch)
        .with_state(router)
        .layer(TraceLayer::new_for_http())
}

/// App serving the virtual hosts on the TLS endpoint, with security headers.
pub fn secure_app(router: Arc<VirtualHostRouter>, headers: &SecurityHeaders) -> Router {
    headers.apply(vhost_app(router))
}

/// App redirecting every request to `https://<host><path-and-query>`.
pub fn redirect_app(default_host: &str) -> Router {
    Router::new()
        .fallback(redirect)
        .with_state(Arc::<str>::from(default_host))
        .layer(TraceLayer::new_for_http())
}

async fn dispatch(State(router): State<Arc<VirtualHostRouter>>, request: Request<Body>) -> Response {
    let response = router.dispatch(request).await;
    metrics::record_request(response.status().as_u16());
    response
}

async fn redirect(State(default_host): State<Arc<str>>, request: Request<Body>) -> Response {
    match https_location(&request, &default_host) {
        Some(location) => (StatusCode::MOVED_PERMANENTLY, [(header::LOCATION, location)]).into_response(),
        None => (StatusCode::BAD_REQUEST, "Invalid Host header").into_response(),
    }
}

/// Location of the HTTPS equivalent of `request`.
pub fn https_location<B>(request: &Request<B>, default_host: &str) -> Option<HeaderValue> {
    let host = request_host(request)
        .filter(|h| !h.is_empty())
        .unwrap_or_else(|| default_host.to_string());
    let path_and_query = request
        .uri()
        .path_and_query()
        .map(|pq| pq.as_str())
        .filter(|pq| !pq.is_empty())
        .unwrap_or("/");
    HeaderValue::from_str(&format!("https://{host}{path_and_query}")).ok()
}
