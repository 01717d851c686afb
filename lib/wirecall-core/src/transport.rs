use std::fmt::Debug;

use async_trait::async_trait;
use tracing::debug;

use crate::request::RequestDescriptor;
use crate::response::ResponseEnvelope;

/// Connection-level failures reported by a [`Transport`].
#[derive(Debug, derive_more::Error, derive_more::Display, derive_more::From)]
pub enum TransportError {
    /// HTTP client error from the underlying reqwest library.
    #[display("{_0}")]
    Reqwest(reqwest::Error),

    /// The connection could not be established or was reset.
    #[display("connection failed: {message}")]
    #[from(skip)]
    Connect {
        /// Description of the failure.
        message: String,
    },

    /// The exchange did not complete in time.
    #[display("request timed out: {message}")]
    #[from(skip)]
    Timeout {
        /// Description of the failure.
        message: String,
    },

    /// The request could not be converted for the underlying client.
    #[display("invalid request: {message}")]
    #[from(skip)]
    InvalidRequest {
        /// Description of the failure.
        message: String,
    },
}

impl TransportError {
    /// Whether retrying the same request may succeed.
    ///
    /// Errors raised while building the request are never transient.
    pub fn is_transient(&self) -> bool {
        match self {
            Self::Reqwest(err) if err.is_builder() => false,
            Self::Reqwest(err) => err.is_connect() || err.is_timeout() || err.is_body(),
            Self::Connect { .. } | Self::Timeout { .. } => true,
            Self::InvalidRequest { .. } => false,
        }
    }
}

/// Performs the HTTP exchange of one request.
///
/// A transport only moves bytes: status codes are interpreted by the invoker.
#[async_trait]
pub trait Transport: Debug + Send + Sync {
    /// Sends the request and reads the whole response.
    async fn execute(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, TransportError>;
}

/// [`Transport`] backed by a [`reqwest::Client`], speaking `http` and `https`.
#[derive(Debug, Clone, Default)]
pub struct ReqwestTransport {
    client: reqwest::Client,
}

impl ReqwestTransport {
    /// Wraps a configured client (timeouts, TLS, proxies).
    pub fn new(client: reqwest::Client) -> Self {
        Self { client }
    }

    fn build_request(request: RequestDescriptor) -> Result<reqwest::Request, TransportError> {
        let scheme = request.url().scheme();
        if scheme != "http" && scheme != "https" {
            return Err(TransportError::InvalidRequest {
                message: format!("unsupported URL scheme '{scheme}'"),
            });
        }

        let mut req = reqwest::Request::new(request.method().clone(), request.url().clone());
        *req.headers_mut() = request.headers().clone();
        if let Some(body) = request.body() {
            *req.body_mut() = Some(reqwest::Body::from(body.clone()));
        }
        Ok(req)
    }
}

impl From<reqwest::Client> for ReqwestTransport {
    fn from(client: reqwest::Client) -> Self {
        Self::new(client)
    }
}

#[async_trait]
impl Transport for ReqwestTransport {
    async fn execute(
        &self,
        request: RequestDescriptor,
    ) -> Result<ResponseEnvelope, TransportError> {
        let request = Self::build_request(request)?;
        debug!(?request, "sending...");
        let response = self.client.execute(request).await?;
        debug!(?response, "...receiving");

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.bytes().await?;

        Ok(ResponseEnvelope::new(status, headers, body))
    }
}
