//! Reverse-proxy backend.
//!
//! # Responsibilities
//! - Rewrite the request URI onto the upstream authority
//! - Forward method, headers and streamed body
//! - Map upstream failures to `502 Bad Gateway`

use axum::body::Body;
use axum::http::uri::{Authority, PathAndQuery, Scheme};
use axum::http::{header, HeaderValue, Request, StatusCode, Uri};
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use hyper_util::client::legacy::connect::HttpConnector;
use hyper_util::client::legacy::Client;
use hyper_util::rt::TokioExecutor;

use crate::backend::{BackendError, RequestHandler};

/// Forwards requests to a single HTTP upstream.
#[derive(Clone)]
pub struct ProxyBackend {
    authority: Authority,
    client: Client<HttpConnector, Body>,
}

impl ProxyBackend {
    /// Create a backend for an `http://host:port` upstream.
    pub fn new(upstream: &str) -> Result<Self, BackendError> {
        let invalid = |reason: &str| BackendError::InvalidUpstream {
            upstream: upstream.to_string(),
            reason: reason.to_string(),
        };

        let uri: Uri = upstream.parse().map_err(|_| invalid("not a URI"))?;
        if uri.scheme() != Some(&Scheme::HTTP) {
            return Err(invalid("scheme must be http"));
        }
        let authority = uri.authority().cloned().ok_or_else(|| invalid("missing host"))?;

        let client = Client::builder(TokioExecutor::new()).build(HttpConnector::new());
        Ok(Self { authority, client })
    }

    fn upstream_uri(&self, original: &Uri) -> Result<Uri, axum::http::Error> {
        let path_and_query = original
            .path_and_query()
            .map(PathAndQuery::as_str)
            .filter(|pq| !pq.is_empty())
            .unwrap_or("/");
        Ok(Uri::builder()
            .scheme(Scheme::HTTP)
            .authority(self.authority.clone())
            .path_and_query(path_and_query)
            .build()?)
    }
}

impl RequestHandler for ProxyBackend {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let backend = self.clone();
        Box::pin(async move {
            let (mut parts, body) = request.into_parts();

            let uri = match backend.upstream_uri(&parts.uri) {
                Ok(uri) => uri,
                Err(e) => {
                    tracing::warn!(error = %e, uri = %parts.uri, "Failed to rewrite request URI");
                    return (StatusCode::BAD_REQUEST, "Invalid request URI").into_response();
                }
            };

            // HTTP/2 requests carry the host in the URI only.
            if !parts.headers.contains_key(header::HOST) {
                if let Some(host) = parts.uri.authority() {
                    if let Ok(value) = HeaderValue::from_str(host.as_str()) {
                        parts.headers.insert(header::HOST, value);
                    }
                }
            }
            parts.uri = uri;
            // Upstreams are plain HTTP/1.1 regardless of the client's protocol.
            parts.version = axum::http::Version::HTTP_11;

            let request = Request::from_parts(parts, body);
            match backend.client.request(request).await {
                Ok(response) => {
                    let (parts, body) = response.into_parts();
                    Response::from_parts(parts, Body::new(body))
                }
                Err(e) => {
                    tracing::error!(upstream = %backend.authority, error = %e, "Upstream error");
                    (StatusCode::BAD_GATEWAY, "Upstream request failed").into_response()
                }
            }
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_non_http_upstreams() {
        assert!(ProxyBackend::new("https://example.com").is_err());
        assert!(ProxyBackend::new("127.0.0.1:3000").is_err());
        assert!(ProxyBackend::new("http://").is_err());
    }

    #[tokio::test]
    async fn rewrites_uri_onto_upstream() {
        let backend = ProxyBackend::new("http://127.0.0.1:3000").unwrap();
        let uri = backend
            .upstream_uri(&"/path/to?x=1".parse().unwrap())
            .unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:3000/path/to?x=1");

        let uri = backend
            .upstream_uri(&"https://public.example.com".parse().unwrap())
            .unwrap();
        assert_eq!(uri.to_string(), "http://127.0.0.1:3000/");
    }

    #[tokio::test]
    async fn unreachable_upstream_is_bad_gateway() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let backend = ProxyBackend::new(&format!("http://{addr}")).unwrap();
        let response = backend
            .handle(Request::builder().uri("/").body(Body::empty()).unwrap())
            .await;
        assert_eq!(response.status(), StatusCode::BAD_GATEWAY);
    }
}
