//! Per-request state handed to actions.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use axum::http::{HeaderMap, HeaderName, HeaderValue, Method, Uri};
use parking_lot::Mutex;

use crate::{ClassKey, DeclarationError, MetadataStore, Model, ModelInstance, RequestData, Resolver, bind};

/// Everything an action may look at for the request it serves.
///
/// Cloning is cheap; clones share the same request and the same pending
/// response headers.
#[derive(Clone)]
pub struct RequestContext {
    inner: Arc<Inner>,
}

struct Inner {
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    data: RequestData,
    store: Arc<MetadataStore>,
    resolver: Arc<dyn Resolver>,
    response_headers: Mutex<HeaderMap>,
}

impl RequestContext {
    /// A context for one request.
    pub fn new(
        method: Method,
        uri: Uri,
        headers: HeaderMap,
        data: RequestData,
        store: Arc<MetadataStore>,
        resolver: Arc<dyn Resolver>,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                method,
                uri,
                headers,
                data,
                store,
                resolver,
                response_headers: Mutex::new(HeaderMap::new()),
            }),
        }
    }

    /// The request method.
    pub fn method(&self) -> &Method {
        &self.inner.method
    }

    /// The request URI.
    pub fn uri(&self) -> &Uri {
        &self.inner.uri
    }

    /// The request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.inner.headers
    }

    /// The query, path-parameter and body buckets.
    pub fn data(&self) -> &RequestData {
        &self.inner.data
    }

    /// The metadata store models are resolved from.
    pub fn store(&self) -> &Arc<MetadataStore> {
        &self.inner.store
    }

    /// Binds the request onto a fresh instance of `class`.
    pub fn bind_model(&self, class: &ClassKey) -> Result<ModelInstance, DeclarationError> {
        bind(&self.inner.store, class, &self.inner.data)
    }

    /// Declares `T` if needed, then binds the request onto it.
    pub fn bind<T: Model>(&self) -> Result<ModelInstance, DeclarationError> {
        let class = self.inner.store.declare::<T>()?;
        self.bind_model(&class)
    }

    /// Resolves a collaborator through the container.
    pub fn resolve<T: Any + Send + Sync>(&self, key: &ClassKey) -> Option<Arc<T>> {
        self.inner.resolver.resolve::<T>(key)
    }

    /// Adds a header to the eventual response.
    pub fn set_response_header(&self, name: HeaderName, value: HeaderValue) {
        self.inner.response_headers.lock().insert(name, value);
    }

    pub(crate) fn take_response_headers(&self) -> HeaderMap {
        std::mem::take(&mut *self.inner.response_headers.lock())
    }
}

impl fmt::Debug for RequestContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RequestContext")
            .field("method", &self.inner.method)
            .field("uri", &self.inner.uri)
            .field("data", &self.inner.data)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use axum::http::header;
    use serde_json::json;

    use super::*;
    use crate::test_utils::test_helpers::sample_store;
    use crate::{Container, FieldValue};

    fn context(data: RequestData) -> RequestContext {
        let mut container = Container::new();
        container.singleton("Greeting", String::from("hi"));
        RequestContext::new(
            Method::POST,
            Uri::from_static("/samples/create?name=q"),
            HeaderMap::new(),
            data,
            Arc::new(sample_store()),
            Arc::new(container),
        )
    }

    #[test]
    fn binds_from_request_data() {
        let cx = context(RequestData::new().with_body("name", json!("Ada")).with_body("age", json!("37")));
        let sample = cx.bind_model(&ClassKey::new("Sample")).unwrap();
        assert_eq!(sample.get("name"), Some(&FieldValue::from("Ada")));
        assert_eq!(sample.get("age"), Some(&FieldValue::Int(37)));
        assert!(cx.bind_model(&ClassKey::new("Nope")).is_err());
    }

    #[test]
    fn resolves_collaborators() {
        let cx = context(RequestData::new());
        assert_eq!(cx.resolve::<String>(&ClassKey::new("Greeting")).unwrap().as_str(), "hi");
        assert!(cx.resolve::<String>(&ClassKey::new("Missing")).is_none());
    }

    #[test]
    fn response_headers_are_shared_and_taken_once() {
        let cx = context(RequestData::new());
        let clone = cx.clone();
        clone.set_response_header(header::CACHE_CONTROL, HeaderValue::from_static("no-store"));
        let headers = cx.take_response_headers();
        assert_eq!(headers.get(header::CACHE_CONTROL).unwrap(), "no-store");
        assert!(cx.take_response_headers().is_empty());
    }
}
