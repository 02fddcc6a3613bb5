//! Static file backend.

use std::convert::Infallible;
use std::path::Path;

use axum::body::Body;
use axum::http::Request;
use axum::response::{IntoResponse, Response};
use futures_util::future::BoxFuture;
use tower::ServiceExt;
use tower_http::services::ServeDir;

use crate::backend::RequestHandler;

/// Serves files from a directory.
#[derive(Clone)]
pub struct FileBackend {
    service: ServeDir,
}

impl FileBackend {
    pub fn new(root: &Path) -> Self {
        Self {
            service: ServeDir::new(root),
        }
    }
}

impl RequestHandler for FileBackend {
    fn handle(&self, request: Request<Body>) -> BoxFuture<'static, Response> {
        let service = self.service.clone();
        Box::pin(async move {
            let result: Result<_, Infallible> = service.oneshot(request).await;
            match result {
                Ok(response) => response.into_response(),
                Err(never) => match never {},
            }
        })
    }
}
