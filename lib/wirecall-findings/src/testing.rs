use std::collections::VecDeque;
use std::sync::Arc;

use async_trait::async_trait;
use http::{HeaderMap, HeaderValue, StatusCode};
use parking_lot::Mutex;
use wirecall_core::{
    Authentication, Invoker, RequestDescriptor, ResponseEnvelope, Transport, TransportError,
};

use crate::FindingsService;

/// Records requests and answers with scripted responses, `200 {}` once exhausted.
///
/// Clones share the script and the recorded requests.
#[derive(Debug, Clone, Default)]
pub(crate) struct SpyTransport {
    responses: Arc<Mutex<VecDeque<ResponseEnvelope>>>,
    requests: Arc<Mutex<Vec<RequestDescriptor>>>,
}

impl SpyTransport {
    pub(crate) fn new(responses: impl IntoIterator<Item = ResponseEnvelope>) -> Self {
        Self {
            responses: Arc::new(Mutex::new(responses.into_iter().collect())),
            requests: Arc::default(),
        }
    }

    pub(crate) fn requests(&self) -> Vec<RequestDescriptor> {
        self.requests.lock().clone()
    }

    pub(crate) fn request_count(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl Transport for SpyTransport {
    async fn execute(
        &self,
        request: RequestDescriptor,
    ) -> Result<ResponseEnvelope, TransportError> {
        self.requests.lock().push(request);
        let response = self.responses.lock().pop_front();
        Ok(response.unwrap_or_else(empty_response))
    }
}

fn json_headers() -> HeaderMap {
    let mut headers = HeaderMap::new();
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert("x-request-id", HeaderValue::from_static("req-1"));
    headers
}

pub(crate) fn raw_response(status: StatusCode, body: &'static str) -> ResponseEnvelope {
    ResponseEnvelope::new(status, json_headers(), body)
}

fn empty_response() -> ResponseEnvelope {
    raw_response(StatusCode::OK, "{}")
}

pub(crate) fn json_response(status: StatusCode, body: &serde_json::Value) -> ResponseEnvelope {
    ResponseEnvelope::new(status, json_headers(), body.to_string())
}

fn init_tracing() {
    // should be run once, fail otherwise, we skip that error
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub(crate) fn service(spy: &SpyTransport) -> FindingsService {
    init_tracing();
    let invoker = Invoker::builder()
        .with_service_url("https://findings.example.com/findings")
        .expect("valid url")
        .with_service("findings", env!("CARGO_PKG_VERSION"))
        .with_authenticator(Authentication::Bearer("token".into()))
        .with_transport(spy.clone())
        .build()
        .expect("should build");
    FindingsService::new(invoker)
}
