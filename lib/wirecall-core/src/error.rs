use http::StatusCode;

use crate::auth::AuthenticationError;
use crate::config::ConfigError;
use crate::response::ResponseEnvelope;
use crate::transport::TransportError;

/// Errors that can occur while building, sending or decoding a call.
///
/// Variants are ordered from the innermost failure (local validation) to the
/// outermost (cancellation of the whole call). Variants produced after a
/// response was received carry the [`ResponseEnvelope`] so the caller can still
/// inspect the status code and headers, see [`CallError::response`].
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum CallError {
    /// A required options field is missing or empty.
    ///
    /// Detected before any network activity.
    #[display("Validation failed: {message}")]
    #[from(skip)]
    Validation {
        /// What is missing.
        message: String,
    },

    /// The base URL combined with the resolved path is not a valid URL.
    #[display("Malformed URL '{url}': {error}")]
    #[from(skip)]
    MalformedUrl {
        /// The URL that failed to parse.
        url: String,
        /// The underlying parse error.
        error: url::ParseError,
    },

    /// The request could not be encoded (body serialization, header values, query string).
    #[display("Encoding error: {message}")]
    #[from(skip)]
    Encoding {
        /// Description of the encoding failure.
        message: String,
    },

    /// The service configuration could not be resolved.
    #[display("Configuration error: {_0}")]
    Config(ConfigError),

    /// The authenticator could not produce credentials.
    ///
    /// No transport I/O happens when this error is returned.
    #[display("Authentication failed: {_0}")]
    Authentication(AuthenticationError),

    /// Connection-level failure reported by the transport.
    #[display("Transport error: {_0}")]
    Transport(TransportError),

    /// The server answered with a non-success status.
    #[display("{message}")]
    #[from(skip)]
    Api {
        /// The response status code.
        status: StatusCode,
        /// Human readable message extracted from the error body.
        message: String,
        /// The error body, when it was valid JSON.
        body: Option<serde_json::Value>,
        /// The raw response.
        response: Box<ResponseEnvelope>,
    },

    /// A success status was received but the body does not match the declared shape.
    #[display("Malformed response at '{path}': {message}")]
    #[from(skip)]
    MalformedResponse {
        /// JSON path of the offending value (`.` for the document root).
        path: String,
        /// Parser or deserializer message.
        message: String,
        /// The raw response.
        response: Box<ResponseEnvelope>,
    },

    /// A variant field carries a discriminator matching no known alternative.
    #[display("Unknown variant at '{path}': {message}")]
    #[from(skip)]
    UnknownVariant {
        /// JSON path of the variant field.
        path: String,
        /// Message naming the unmatched discriminator value.
        message: String,
        /// The raw response.
        response: Box<ResponseEnvelope>,
    },

    /// The call deadline elapsed.
    #[display("Deadline exceeded")]
    #[from(skip)]
    DeadlineExceeded,

    /// The call was cancelled by the caller.
    #[display("Call cancelled")]
    #[from(skip)]
    Cancelled,
}

impl CallError {
    /// A [`CallError::Validation`] with the given message.
    pub fn validation(message: impl Into<String>) -> Self {
        Self::Validation {
            message: message.into(),
        }
    }

    /// A [`CallError::Encoding`] with the given message.
    pub fn encoding(message: impl Into<String>) -> Self {
        Self::Encoding {
            message: message.into(),
        }
    }

    /// The response envelope received before the failure, if any.
    pub fn response(&self) -> Option<&ResponseEnvelope> {
        match self {
            Self::Api { response, .. }
            | Self::MalformedResponse { response, .. }
            | Self::UnknownVariant { response, .. } => Some(response),
            _ => None,
        }
    }

    /// The HTTP status code of the response, if one was received.
    pub fn status_code(&self) -> Option<StatusCode> {
        self.response().map(ResponseEnvelope::status)
    }

    /// Whether the error was raised by the caller's context.
    pub fn is_cancellation(&self) -> bool {
        matches!(self, Self::DeadlineExceeded | Self::Cancelled)
    }
}

#[cfg(test)]
mod tests {
    use http::HeaderMap;

    use super::*;

    #[test]
    fn test_call_error_is_send_and_sync() {
        fn assert_send<T: Send>() {}
        fn assert_sync<T: Sync>() {}

        assert_send::<CallError>();
        assert_sync::<CallError>();
    }

    #[test]
    fn should_display_api_error_as_its_message() {
        let response = ResponseEnvelope::new(StatusCode::NOT_FOUND, HeaderMap::new(), "{}");
        let error = CallError::Api {
            status: StatusCode::NOT_FOUND,
            message: "Note not found".to_string(),
            body: None,
            response: Box::new(response),
        };

        insta::assert_snapshot!(error, @"Note not found");
        assert_eq!(error.status_code(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn should_not_expose_response_for_local_errors() {
        let error = CallError::validation("accountId must be provided");

        assert!(error.response().is_none());
        assert!(error.status_code().is_none());
        assert!(!error.is_cancellation());
        assert!(CallError::DeadlineExceeded.is_cancellation());
    }
}
