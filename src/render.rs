//! View rendering.
//!
//! The framework does not ship a template engine.  A [`ViewRenderer`] turns a
//! view name and its data into bytes on a [`ResponseWriter`]; the writer is
//! buffered and becomes the response once every action result has been
//! interpreted.

use async_trait::async_trait;
use axum::body::Body;
use axum::http::{HeaderMap, HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use serde_json::Value;

use crate::{RenderError, RequestContext, RouteInfo};

/// A buffered response under construction.
#[derive(Debug, Default)]
pub struct ResponseWriter {
    status: Option<StatusCode>,
    headers: HeaderMap,
    body: Vec<u8>,
}

impl ResponseWriter {
    /// An empty writer with no status set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the status, replacing any earlier one.
    pub fn set_status(&mut self, status: StatusCode) {
        self.status = Some(status);
    }

    /// The status set so far.
    pub fn status(&self) -> Option<StatusCode> {
        self.status
    }

    /// True once a status was set.
    pub fn status_is_set(&self) -> bool {
        self.status.is_some()
    }

    /// The response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Mutable access to the response headers.
    pub fn headers_mut(&mut self) -> &mut HeaderMap {
        &mut self.headers
    }

    /// Sets `content-type` unless one is already present.
    pub fn default_content_type(&mut self, content_type: &'static str) {
        self.headers
            .entry(header::CONTENT_TYPE)
            .or_insert(HeaderValue::from_static(content_type));
    }

    /// Appends to the body.
    pub fn write(&mut self, bytes: impl AsRef<[u8]>) {
        self.body.extend_from_slice(bytes.as_ref());
    }

    /// The body written so far.
    pub fn body(&self) -> &[u8] {
        &self.body
    }
}

impl IntoResponse for ResponseWriter {
    fn into_response(self) -> Response {
        let mut response = Response::new(Body::from(self.body));
        *response.status_mut() = self.status.unwrap_or(StatusCode::OK);
        *response.headers_mut() = self.headers;
        response
    }
}

/// What a renderer gets to see.
#[derive(Debug, Clone, Copy)]
pub struct ViewContext<'a> {
    /// The view name from the action result.
    pub name: &'a str,
    /// The response status in effect.
    pub status: StatusCode,
    /// The view's data.
    pub data: &'a Value,
    /// The route being served.
    pub route: &'a RouteInfo,
    /// The request being served.
    pub request: &'a RequestContext,
}

/// Renders named views.
#[async_trait]
pub trait ViewRenderer: Send + Sync {
    /// Writes the view into `out`.
    async fn render(&self, view: ViewContext<'_>, out: &mut ResponseWriter) -> Result<(), RenderError>;
}

/// The renderer used until one is configured; every view fails.
#[derive(Debug, Default)]
pub struct MissingRenderer;

#[async_trait]
impl ViewRenderer for MissingRenderer {
    async fn render(&self, view: ViewContext<'_>, _: &mut ResponseWriter) -> Result<(), RenderError> {
        Err(RenderError::NotConfigured(view.name.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writer_defaults_to_ok() {
        let mut writer = ResponseWriter::new();
        assert!(!writer.status_is_set());
        writer.write("hello ");
        writer.write(b"world");
        assert_eq!(writer.body(), b"hello world");
        let response = writer.into_response();
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn default_content_type_keeps_existing() {
        let mut writer = ResponseWriter::new();
        writer
            .headers_mut()
            .insert(header::CONTENT_TYPE, HeaderValue::from_static("text/plain"));
        writer.default_content_type("text/html; charset=utf-8");
        assert_eq!(writer.headers()[header::CONTENT_TYPE], "text/plain");
        writer.set_status(StatusCode::CREATED);
        assert_eq!(writer.into_response().status(), StatusCode::CREATED);
    }
}
