use bytes::Bytes;
use http::{HeaderMap, StatusCode};

/// Raw response of one HTTP exchange.
///
/// The envelope owns its body bytes; no transport resource is kept alive once it exists.
#[derive(Clone, PartialEq, Eq, derive_more::Debug)]
pub struct ResponseEnvelope {
    status: StatusCode,
    headers: HeaderMap,
    #[debug(ignore)]
    body: Bytes,
}

impl ResponseEnvelope {
    /// Creates an envelope from its parts.
    pub fn new(status: StatusCode, headers: HeaderMap, body: impl Into<Bytes>) -> Self {
        Self {
            status,
            headers,
            body: body.into(),
        }
    }

    /// Returns the HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the raw body bytes.
    pub fn body(&self) -> &Bytes {
        &self.body
    }

    /// Returns the body as text, replacing invalid UTF-8 sequences.
    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// `true` for 1xx, 2xx and 3xx statuses.
    pub fn is_success(&self) -> bool {
        self.status.as_u16() < 400
    }

    pub(crate) fn into_parts(self) -> (StatusCode, HeaderMap, Bytes) {
        (self.status, self.headers, self.body)
    }
}

/// A decoded response: status, headers and the typed result.
#[derive(Debug, Clone, PartialEq)]
pub struct DetailedResponse<T> {
    status: StatusCode,
    headers: HeaderMap,
    result: T,
}

impl<T> DetailedResponse<T> {
    pub(crate) fn new(status: StatusCode, headers: HeaderMap, result: T) -> Self {
        Self {
            status,
            headers,
            result,
        }
    }

    /// Returns the HTTP status code.
    pub fn status(&self) -> StatusCode {
        self.status
    }

    /// Returns the response headers.
    pub fn headers(&self) -> &HeaderMap {
        &self.headers
    }

    /// Returns the decoded result.
    pub fn result(&self) -> &T {
        &self.result
    }

    /// Consumes the response and returns the decoded result.
    pub fn into_result(self) -> T {
        self.result
    }

    /// Transforms the decoded result, keeping status and headers.
    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> DetailedResponse<U> {
        DetailedResponse {
            status: self.status,
            headers: self.headers,
            result: f(self.result),
        }
    }
}

/// Extracts a human readable message from an error body.
///
/// Looks at `errors[0].message`, `error`, `message`, `errorMessage` and
/// `error_description` in that order.
pub(crate) fn error_message(body: &serde_json::Value) -> Option<String> {
    let from_errors = body
        .get("errors")
        .and_then(|errors| errors.get(0))
        .and_then(|first| first.get("message"))
        .and_then(serde_json::Value::as_str);

    from_errors
        .or_else(|| {
            ["error", "message", "errorMessage", "error_description"]
                .into_iter()
                .find_map(|key| body.get(key).and_then(serde_json::Value::as_str))
        })
        .map(str::to_string)
}

/// Default message when the error body does not provide one.
pub(crate) fn status_message(status: StatusCode) -> String {
    status
        .canonical_reason()
        .map_or_else(|| format!("HTTP {}", status.as_u16()), str::to_string)
}
