use serde::de::DeserializeOwned;
use tracing::debug;

use crate::variant::{clear_discriminator_miss, take_discriminator_miss};
use crate::{CallError, DetailedResponse, ResponseEnvelope};

/// Turns response envelopes into typed results.
///
/// Decoding happens in two steps: the body is parsed into a
/// [`serde_json::Value`], then projected into the result type while tracking
/// the JSON path of the value being decoded. Both failures keep the envelope so
/// the status code and headers stay inspectable.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResponseDecoder;

impl ResponseDecoder {
    /// Decodes the body as `T`.
    ///
    /// # Errors
    ///
    /// - [`CallError::MalformedResponse`] if the body is not JSON or does not match `T`
    /// - [`CallError::UnknownVariant`] if a [`VariantRegistry`](crate::VariantRegistry)
    ///   field has an unknown discriminator
    ///
    /// # Example
    ///
    /// ```rust
    /// use http::{HeaderMap, StatusCode};
    /// use serde::Deserialize;
    /// use wirecall_core::{ResponseDecoder, ResponseEnvelope};
    ///
    /// #[derive(Debug, Deserialize)]
    /// struct Note {
    ///     id: String,
    /// }
    ///
    /// let body = r#"{"id":"n1"}"#;
    /// let envelope = ResponseEnvelope::new(StatusCode::OK, HeaderMap::new(), body);
    /// let response = ResponseDecoder::decode::<Note>(envelope)?;
    ///
    /// assert_eq!(response.result().id, "n1");
    /// # Ok::<(), wirecall_core::CallError>(())
    /// ```
    pub fn decode<T: DeserializeOwned>(
        envelope: ResponseEnvelope,
    ) -> Result<DetailedResponse<T>, CallError> {
        let value = match serde_json::from_slice::<serde_json::Value>(envelope.body()) {
            Ok(value) => value,
            Err(err) => {
                debug!(status = %envelope.status(), %err, "response body is not JSON");
                return Err(CallError::MalformedResponse {
                    path: ".".to_string(),
                    message: err.to_string(),
                    response: Box::new(envelope),
                });
            }
        };

        clear_discriminator_miss();
        let decoded = serde_path_to_error::deserialize::<_, T>(value);
        let miss = take_discriminator_miss();
        match decoded {
            Ok(result) => {
                let (status, headers, _) = envelope.into_parts();
                Ok(DetailedResponse::new(status, headers, result))
            }
            Err(err) => {
                let path = err.path().to_string();
                let message = err.into_inner().to_string();
                debug!(
                    status = %envelope.status(), %path, %message,
                    "response body does not match"
                );
                let response = Box::new(envelope);
                if miss.is_some_and(|miss| message.starts_with(&miss)) {
                    Err(CallError::UnknownVariant {
                        path,
                        message,
                        response,
                    })
                } else {
                    Err(CallError::MalformedResponse {
                        path,
                        message,
                        response,
                    })
                }
            }
        }
    }

    /// Accepts any body for operations without a result.
    ///
    /// # Errors
    ///
    /// Never fails; the `Result` keeps the signature aligned with [`decode`](Self::decode).
    pub fn decode_empty(envelope: ResponseEnvelope) -> Result<DetailedResponse<()>, CallError> {
        let (status, headers, _) = envelope.into_parts();
        Ok(DetailedResponse::new(status, headers, ()))
    }
}
