use bytes::Bytes;
use headers::{ContentType, HeaderMapExt};
use http::header::{CONTENT_TYPE, HeaderName, HeaderValue};
use http::{HeaderMap, Method};
use serde::Serialize;
use url::Url;

use crate::auth::Credential;
use crate::{CallBody, CallError, CallHeaders, CallQuery, JsonObject, PathTemplate};

/// Accumulates the parts of one HTTP request.
///
/// The builder is consumed by [`build`](Self::build), which produces an
/// immutable [`RequestDescriptor`].
///
/// # Header precedence
///
/// Invoker default headers < caller headers < body content type. A caller
/// header named `Content-Type` never overrides the content type of the body.
///
/// # Example
///
/// ```rust
/// use http::Method;
/// use wirecall_core::{PathTemplate, RequestBuilder};
///
/// let template = PathTemplate::new("/v1/{account_id}/notes");
/// let request = RequestBuilder::new(Method::GET)
///     .with_route("https://api.example.com", &template, &["a1"])?
///     .add_optional_query("page_size", Some(2))
///     .add_optional_query("page_token", None::<String>)
///     .add_header("Accept", "application/json")
///     .build()?;
///
/// assert_eq!(request.url().as_str(), "https://api.example.com/v1/a1/notes?page_size=2");
/// # Ok::<(), wirecall_core::CallError>(())
/// ```
#[derive(Debug)]
pub struct RequestBuilder {
    method: Method,
    url: Option<Url>,
    query: CallQuery,
    headers: CallHeaders,
    body: Option<BodySource>,
}

#[derive(Debug)]
enum BodySource {
    Ready(CallBody),
    Json(Result<CallBody, CallError>),
}

impl RequestBuilder {
    /// Starts a request with the given method.
    pub fn new(method: Method) -> Self {
        Self {
            method,
            url: None,
            query: CallQuery::new(),
            headers: CallHeaders::new(),
            body: None,
        }
    }

    /// Sets the target URL; its query string, if any, is kept before added parameters.
    pub fn with_url(mut self, url: Url) -> Self {
        self.url = Some(url);
        self
    }

    /// Resolves a route template against the base URL.
    ///
    /// # Errors
    ///
    /// See [`PathTemplate::resolve_url`].
    pub fn with_route<S: AsRef<str>>(
        self,
        base_url: &str,
        template: &PathTemplate,
        params: &[S],
    ) -> Result<Self, CallError> {
        let url = template.resolve_url(base_url, params)?;
        Ok(self.with_url(url))
    }

    /// Appends a header value.
    pub fn add_header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers = self.headers.add_header(name, value);
        self
    }

    /// Merges caller headers; each name in `headers` replaces earlier values of that name.
    pub fn with_headers(mut self, headers: CallHeaders) -> Self {
        self.headers = self.headers.merge(headers);
        self
    }

    /// Appends a query parameter.
    pub fn add_query(mut self, name: impl Into<String>, value: impl std::fmt::Display) -> Self {
        self.query = self.query.add_param(name, value);
        self
    }

    /// Appends a query parameter when a value is present.
    pub fn add_optional_query<T: std::fmt::Display>(
        mut self,
        name: impl Into<String>,
        value: Option<T>,
    ) -> Self {
        self.query = self.query.add_optional_param(name, value);
        self
    }

    /// Sets a structured JSON body.
    ///
    /// Serialization errors are reported by [`build`](Self::build).
    pub fn with_json<T: Serialize + ?Sized>(mut self, value: &T) -> Self {
        self.body = Some(BodySource::Json(CallBody::json(value)));
        self
    }

    /// Sets a JSON body built field by field.
    pub fn with_json_object(mut self, object: JsonObject) -> Self {
        self.body = Some(BodySource::Json(CallBody::json_object(object)));
        self
    }

    /// Sets a prepared body.
    pub fn with_body(mut self, body: CallBody) -> Self {
        self.body = Some(BodySource::Ready(body));
        self
    }

    /// Sets opaque bytes sent verbatim with the declared content type.
    pub fn with_raw(self, data: impl Into<Bytes>, content_type: ContentType) -> Self {
        self.with_body(CallBody::raw(data, content_type))
    }

    /// Produces the request descriptor.
    ///
    /// # Errors
    ///
    /// - [`CallError::Validation`] if no URL was set
    /// - [`CallError::Encoding`] if the body, headers or query cannot be encoded
    pub fn build(self) -> Result<RequestDescriptor, CallError> {
        let Self {
            method,
            url,
            query,
            headers,
            body,
        } = self;

        let mut url = url
            .ok_or_else(|| CallError::validation("request URL must be set"))?;
        if !query.is_empty() {
            let added = query.to_query_string()?;
            let query_string = match url.query() {
                Some(existing) if !existing.is_empty() => format!("{existing}&{added}"),
                _ => added,
            };
            url.set_query(Some(&query_string));
        }

        let mut header_map = headers.to_header_map()?;
        let body = match body {
            None => None,
            Some(BodySource::Ready(body)) => Some(body),
            Some(BodySource::Json(body)) => Some(body?),
        };
        let body = body.map(|body| {
            header_map.typed_insert(body.content_type.clone());
            body.data
        });

        Ok(RequestDescriptor {
            method,
            url,
            headers: header_map,
            body,
        })
    }
}

/// Fully resolved, immutable representation of one HTTP request.
#[derive(Clone, PartialEq, derive_more::Debug)]
pub struct RequestDescriptor {
    method: Method,
    url: Url,
    headers: HeaderMap,
    #[debug(ignore)]
    body: Option<Bytes>,
}

impl RequestDescriptor {
    /// Returns the HTTP method.
    pub fn method(&self) -> &Method {
        &self.method
    }

    /// Returns the full URL, including the query string.
    pub fn url(&self) -> &Url {
        &self.url
    }

    /// Returns the request headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the body bytes.
    pub fn body(&self) -> Option<&Bytes> {
        self.body.as_ref()
    }

    /// Returns the declared content type of the body.
    pub fn content_type(&self) -> Option<&HeaderValue> {
        self.headers.get(CONTENT_TYPE)
    }

    /// Returns a copy with `defaults` applied under the request's own headers.
    ///
    /// A default is only used when the request has no header of that name.
    pub(crate) fn with_default_headers(&self, defaults: &HeaderMap) -> Self {
        let mut headers = HeaderMap::with_capacity(defaults.len() + self.headers.len());
        for name in defaults.keys() {
            if !self.headers.contains_key(name) {
                for value in defaults.get_all(name) {
                    headers.append(name.clone(), value.clone());
                }
            }
        }
        for (name, value) in &self.headers {
            headers.append(name.clone(), value.clone());
        }
        let mut merged = self.clone();
        merged.headers = headers;
        merged
    }

    /// Returns a copy carrying the given credentials.
    ///
    /// Header credentials replace any header of the same name; query
    /// credentials are appended to the query string.
    pub(crate) fn with_credentials(
        &self,
        credentials: Vec<Credential>,
    ) -> Result<Self, CallError> {
        let mut authenticated = self.clone();
        for credential in credentials {
            match credential {
                Credential::Header { name, value } => {
                    let name = HeaderName::from_bytes(name.as_bytes()).map_err(|err| {
                        let message = format!("invalid credential header name '{name}': {err}");
                        CallError::encoding(message)
                    })?;
                    let mut value = HeaderValue::from_str(value.as_str()).map_err(|err| {
                        CallError::encoding(format!("invalid credential header value: {err}"))
                    })?;
                    value.set_sensitive(true);
                    authenticated.headers.insert(name, value);
                }
                Credential::Query { name, value } => {
                    authenticated
                        .url
                        .query_pairs_mut()
                        .append_pair(&name, value.as_str());
                }
            }
        }
        Ok(authenticated)
    }
}
