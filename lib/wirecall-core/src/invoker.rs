use std::sync::Arc;

use http::HeaderMap;
use http::header::{HeaderName, HeaderValue, USER_AGENT};
use parking_lot::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::auth::{Authenticator, NoAuth};
use crate::response::{error_message, status_message};
use crate::transport::{ReqwestTransport, Transport};
use crate::{CallContext, CallError, CallHeaders, RequestDescriptor, ResponseEnvelope, RetryPolicy};

const SERVICE_NAME_HEADER: HeaderName = HeaderName::from_static("x-service-name");

/// Immutable configuration snapshot used by one call.
#[derive(Debug, Clone)]
pub struct InvokerConfig {
    service_url: String,
    service_name: Option<String>,
    service_version: Option<String>,
    provenance: HeaderMap,
    default_headers: HeaderMap,
    retry: Option<RetryPolicy>,
}

impl InvokerConfig {
    /// The base URL, without trailing slash.
    pub fn service_url(&self) -> &str {
        &self.service_url
    }

    /// The service name advertised in provenance headers.
    pub fn service_name(&self) -> Option<&str> {
        self.service_name.as_deref()
    }

    /// The service version advertised in provenance headers.
    pub fn service_version(&self) -> Option<&str> {
        self.service_version.as_deref()
    }

    /// Provenance headers overlaid by the configured default headers.
    pub fn default_headers(&self) -> HeaderMap {
        let mut headers = self.provenance.clone();
        for name in self.default_headers.keys() {
            headers.remove(name);
        }
        for (name, value) in &self.default_headers {
            headers.append(name.clone(), value.clone());
        }
        headers
    }

    /// The retry policy, `None` when retries are disabled.
    pub fn retry(&self) -> Option<&RetryPolicy> {
        self.retry.as_ref()
    }
}

fn provenance_headers(
    service_name: Option<&str>,
    service_version: Option<&str>,
) -> Result<HeaderMap, CallError> {
    let mut user_agent = format!("wirecall/{}", env!("CARGO_PKG_VERSION"));
    if let Some(name) = service_name {
        let version = service_version.unwrap_or("unknown");
        user_agent.push_str(&format!(" ({name}/{version})"));
    }

    let mut headers = HeaderMap::new();
    let user_agent = HeaderValue::from_str(&user_agent)
        .map_err(|err| CallError::encoding(format!("invalid user agent '{user_agent}': {err}")))?;
    headers.insert(USER_AGENT, user_agent);
    if let Some(name) = service_name {
        let name = HeaderValue::from_str(name)
            .map_err(|err| CallError::encoding(format!("invalid service name '{name}': {err}")))?;
        headers.insert(SERVICE_NAME_HEADER, name);
    }
    Ok(headers)
}

fn parse_service_url(service_url: &str) -> Result<String, CallError> {
    let trimmed = service_url.trim().trim_end_matches('/');
    if trimmed.is_empty() {
        return Err(CallError::validation("service URL must be provided"));
    }
    Url::parse(trimmed).map_err(|error| CallError::MalformedUrl {
        url: trimmed.to_string(),
        error,
    })?;
    Ok(trimmed.to_string())
}

/// Sends request descriptors with authentication, retries and cancellation.
///
/// The configuration is an immutable [`InvokerConfig`] snapshot swapped
/// copy-on-write: a call keeps the snapshot it started with, setters only
/// affect later calls. Clones share the configuration, the transport and the
/// authenticator.
#[derive(Debug, Clone)]
pub struct Invoker {
    config: Arc<RwLock<Arc<InvokerConfig>>>,
    transport: Arc<dyn Transport>,
    authenticator: Arc<dyn Authenticator>,
}

impl Invoker {
    /// Creates a new `InvokerBuilder`.
    pub fn builder() -> InvokerBuilder {
        InvokerBuilder::default()
    }

    /// The current configuration snapshot.
    pub fn config(&self) -> Arc<InvokerConfig> {
        Arc::clone(&self.config.read())
    }

    /// The current base URL.
    pub fn service_url(&self) -> String {
        self.config().service_url.clone()
    }

    fn update(&self, change: impl FnOnce(&mut InvokerConfig)) {
        let mut guard = self.config.write();
        let mut next = InvokerConfig::clone(&guard);
        change(&mut next);
        *guard = Arc::new(next);
    }

    /// Replaces the base URL.
    ///
    /// # Errors
    ///
    /// - [`CallError::Validation`] for an empty URL
    /// - [`CallError::MalformedUrl`] when it does not parse
    pub fn set_service_url(&self, service_url: &str) -> Result<(), CallError> {
        let service_url = parse_service_url(service_url)?;
        self.update(|config| config.service_url = service_url);
        Ok(())
    }

    /// Enables retries of transient failures.
    pub fn enable_retries(&self, policy: RetryPolicy) {
        self.update(|config| config.retry = Some(policy));
    }

    /// Disables retries; every call makes a single attempt.
    pub fn disable_retries(&self) {
        self.update(|config| config.retry = None);
    }

    /// Replaces the default headers sent with every call.
    ///
    /// Provenance headers stay unless `headers` names them.
    ///
    /// # Errors
    ///
    /// [`CallError::Encoding`] for invalid header names or values.
    pub fn set_default_headers(&self, headers: &CallHeaders) -> Result<(), CallError> {
        let headers = headers.to_header_map()?;
        self.update(|config| config.default_headers = headers);
        Ok(())
    }

    /// Sends the request with the current configuration snapshot.
    ///
    /// # Errors
    ///
    /// See [`send_with_config`](Self::send_with_config).
    pub async fn send(
        &self,
        request: RequestDescriptor,
        ctx: &CallContext,
    ) -> Result<ResponseEnvelope, CallError> {
        let config = self.config();
        self.send_with_config(&config, request, ctx).await
    }

    /// Sends the request with `config`, returning the raw response of the last attempt.
    ///
    /// Callers that built the request URL from a snapshot pass that same
    /// snapshot, so one call never mixes two configurations.
    ///
    /// # Errors
    ///
    /// - [`CallError::Authentication`] when no credentials could be produced, without I/O
    /// - [`CallError::Transport`] for connection-level failures
    /// - [`CallError::Api`] for responses with a status of 400 or more
    /// - [`CallError::DeadlineExceeded`] / [`CallError::Cancelled`] when the context fires
    pub async fn send_with_config(
        &self,
        config: &InvokerConfig,
        request: RequestDescriptor,
        ctx: &CallContext,
    ) -> Result<ResponseEnvelope, CallError> {
        ctx.check()?;

        let request = request.with_default_headers(&config.default_headers());
        let credentials = ctx.run(self.authenticator.authenticate(&request)).await??;
        let request = request.with_credentials(credentials)?;

        let mut retry = config.retry().map(|policy| (policy, policy.backoff()));
        let mut attempt = 1_usize;
        loop {
            debug!(attempt, method = %request.method(), url = %request.url(), "sending...");
            let error = match ctx.run(self.exchange(request.clone())).await? {
                Ok(response) => {
                    debug!(attempt, status = %response.status(), "...receiving");
                    return Ok(response);
                }
                Err(error) => error,
            };

            let Some((policy, backoff)) = retry.as_mut() else {
                return Err(error);
            };
            if !policy.is_retryable(&error) {
                return Err(error);
            }
            let Some(computed) = backoff.next() else {
                warn!(attempt, %error, "giving up, no attempt left");
                return Err(error);
            };

            let delay = policy.delay_for(&error, computed);
            debug!(attempt, ?delay, %error, "retrying...");
            ctx.sleep(delay).await?;
            attempt += 1;
        }
    }

    async fn exchange(&self, request: RequestDescriptor) -> Result<ResponseEnvelope, CallError> {
        let response = self.transport.execute(request).await?;
        if response.is_success() {
            return Ok(response);
        }

        let status = response.status();
        let body = serde_json::from_slice::<serde_json::Value>(response.body()).ok();
        let message = body
            .as_ref()
            .and_then(error_message)
            .unwrap_or_else(|| status_message(status));
        Err(CallError::Api {
            status,
            message,
            body,
            response: Box::new(response),
        })
    }
}

/// Builder for [`Invoker`].
///
/// # Example
///
/// ```rust
/// use std::time::Duration;
/// use wirecall_core::{Authentication, Invoker, RetryPolicy};
///
/// let invoker = Invoker::builder()
///     .with_service_url("https://findings.example.com/api")?
///     .with_service("findings", "1.2.0")
///     .with_authenticator(Authentication::Bearer("my-token".into()))
///     .with_retries(RetryPolicy::default().with_max_attempts(3))
///     .build()?;
///
/// assert_eq!(invoker.service_url(), "https://findings.example.com/api");
/// # Ok::<(), wirecall_core::CallError>(())
/// ```
#[derive(Debug, Default)]
pub struct InvokerBuilder {
    service_url: Option<String>,
    service_name: Option<String>,
    service_version: Option<String>,
    default_headers: CallHeaders,
    retry: Option<RetryPolicy>,
    transport: Option<Arc<dyn Transport>>,
    authenticator: Option<Arc<dyn Authenticator>>,
}

impl InvokerBuilder {
    /// Sets the base URL; a trailing `/` is removed.
    ///
    /// # Errors
    ///
    /// - [`CallError::Validation`] for an empty URL
    /// - [`CallError::MalformedUrl`] when it does not parse
    pub fn with_service_url(mut self, service_url: &str) -> Result<Self, CallError> {
        self.service_url = Some(parse_service_url(service_url)?);
        Ok(self)
    }

    /// Names the service in provenance headers.
    pub fn with_service(mut self, name: impl Into<String>, version: impl Into<String>) -> Self {
        self.service_name = Some(name.into());
        self.service_version = Some(version.into());
        self
    }

    /// Headers sent with every call, under the caller's headers.
    pub fn with_default_headers(mut self, headers: CallHeaders) -> Self {
        self.default_headers = headers;
        self
    }

    /// Enables retries with the given policy.
    pub fn with_retries(mut self, policy: RetryPolicy) -> Self {
        self.retry = Some(policy);
        self
    }

    /// Uses a custom transport instead of [`ReqwestTransport`].
    pub fn with_transport(mut self, transport: impl Transport + 'static) -> Self {
        self.transport = Some(Arc::new(transport));
        self
    }

    /// Attaches credentials to every call; defaults to [`NoAuth`].
    pub fn with_authenticator(mut self, authenticator: impl Authenticator + 'static) -> Self {
        self.authenticator = Some(Arc::new(authenticator));
        self
    }

    /// Builds the invoker.
    ///
    /// # Errors
    ///
    /// - [`CallError::Validation`] if no service URL was set
    /// - [`CallError::Encoding`] for invalid default or provenance headers
    pub fn build(self) -> Result<Invoker, CallError> {
        let Self {
            service_url,
            service_name,
            service_version,
            default_headers,
            retry,
            transport,
            authenticator,
        } = self;

        let service_url = service_url
            .ok_or_else(|| CallError::validation("service URL must be provided"))?;
        let provenance = provenance_headers(service_name.as_deref(), service_version.as_deref())?;
        let default_headers = default_headers.to_header_map()?;

        let config = InvokerConfig {
            service_url,
            service_name,
            service_version,
            provenance,
            default_headers,
            retry,
        };

        Ok(Invoker {
            config: Arc::new(RwLock::new(Arc::new(config))),
            transport: transport.unwrap_or_else(|| Arc::new(ReqwestTransport::default())),
            authenticator: authenticator.unwrap_or_else(|| Arc::new(NoAuth)),
        })
    }
}

#[cfg(test)]
mod tests {
    use std::collections::VecDeque;
    use std::time::Duration;

    use async_trait::async_trait;
    use http::{Method, StatusCode};
    use parking_lot::Mutex;
    use tokio::time::Instant;

    use super::*;
    use crate::auth::{AuthenticationError, Credential};
    use crate::transport::TransportError;
    use crate::{Authentication, RequestBuilder};

    type Outcome = Result<ResponseEnvelope, TransportError>;

    #[derive(Debug, Default)]
    struct ScriptedTransport {
        outcomes: Mutex<VecDeque<Outcome>>,
        calls: Mutex<Vec<(Instant, RequestDescriptor)>>,
    }

    impl ScriptedTransport {
        fn new(outcomes: impl IntoIterator<Item = Outcome>) -> Arc<Self> {
            Arc::new(Self {
                outcomes: Mutex::new(outcomes.into_iter().collect()),
                calls: Mutex::default(),
            })
        }

        fn calls(&self) -> Vec<(Instant, RequestDescriptor)> {
            self.calls.lock().clone()
        }
    }

    #[async_trait]
    impl Transport for Arc<ScriptedTransport> {
        async fn execute(
            &self,
            request: RequestDescriptor,
        ) -> Result<ResponseEnvelope, TransportError> {
            self.calls.lock().push((Instant::now(), request));
            self.outcomes
                .lock()
                .pop_front()
                .unwrap_or_else(|| Ok(status(StatusCode::OK)))
        }
    }

    #[derive(Debug)]
    struct FailingAuthenticator;

    #[async_trait]
    impl Authenticator for FailingAuthenticator {
        async fn authenticate(
            &self,
            _request: &RequestDescriptor,
        ) -> Result<Vec<Credential>, AuthenticationError> {
            Err(AuthenticationError::TokenRequest {
                message: "token endpoint unavailable".to_string(),
            })
        }
    }

    fn init_tracing() {
        // should be run once, fail otherwise, we skip that error
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    }

    fn header(headers: &HeaderMap, name: impl http::header::AsHeaderName) -> &str {
        headers
            .get(name)
            .and_then(|value| value.to_str().ok())
            .unwrap_or_default()
    }

    fn status(status: StatusCode) -> ResponseEnvelope {
        ResponseEnvelope::new(status, HeaderMap::new(), "{}")
    }

    fn request(invoker: &Invoker) -> RequestDescriptor {
        let url = format!("{}/v1/a1/notes", invoker.service_url());
        RequestBuilder::new(Method::GET)
            .with_url(url.parse().expect("valid url"))
            .build()
            .expect("should build")
    }

    fn invoker(transport: &Arc<ScriptedTransport>) -> Invoker {
        Invoker::builder()
            .with_service_url("https://findings.example.com/")
            .expect("valid url")
            .with_service("findings", "1.2.0")
            .with_transport(Arc::clone(transport))
            .build()
            .expect("should build")
    }

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::default()
            .with_max_attempts(3)
            .with_base_interval(Duration::from_millis(10))
            .with_max_interval(Duration::from_millis(100))
    }

    #[tokio::test]
    async fn should_send_provenance_and_credentials() {
        let transport = ScriptedTransport::new([]);
        let invoker = Invoker::builder()
            .with_service_url("https://findings.example.com")
            .expect("valid url")
            .with_service("findings", "1.2.0")
            .with_authenticator(Authentication::Bearer("token".into()))
            .with_transport(Arc::clone(&transport))
            .build()
            .expect("should build");

        invoker
            .send(request(&invoker), &CallContext::new())
            .await
            .expect("should succeed");

        let calls = transport.calls();
        let headers = calls[0].1.headers();
        insta::assert_snapshot!(header(headers, USER_AGENT), @"wirecall/0.1.0 (findings/1.2.0)");
        assert_eq!(header(headers, "x-service-name"), "findings");
        assert_eq!(header(headers, "authorization"), "Bearer token");
    }

    #[tokio::test]
    async fn should_fail_authentication_without_io() {
        let transport = ScriptedTransport::new([]);
        let invoker = Invoker::builder()
            .with_service_url("https://findings.example.com")
            .expect("valid url")
            .with_authenticator(FailingAuthenticator)
            .with_retries(fast_policy())
            .with_transport(Arc::clone(&transport))
            .build()
            .expect("should build");

        let result = invoker.send(request(&invoker), &CallContext::new()).await;

        assert!(matches!(result, Err(CallError::Authentication(_))));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn should_turn_error_status_into_api_error() {
        let mut headers = HeaderMap::new();
        headers.insert("x-request-id", HeaderValue::from_static("r-1"));
        let transport = ScriptedTransport::new([Ok(ResponseEnvelope::new(
            StatusCode::NOT_FOUND,
            headers,
            r#"{"errors":[{"code":"not_found","message":"Note n1 not found"}]}"#,
        ))]);
        let invoker = invoker(&transport);

        let error = invoker
            .send(request(&invoker), &CallContext::new())
            .await
            .expect_err("should fail");

        let response = error.response().expect("should keep the response");
        insta::assert_snapshot!(error, @"Note n1 not found");
        assert_eq!(error.status_code(), Some(StatusCode::NOT_FOUND));
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn should_not_retry_by_default() {
        let transport = ScriptedTransport::new([Ok(status(StatusCode::SERVICE_UNAVAILABLE))]);
        let invoker = invoker(&transport);

        let error = invoker
            .send(request(&invoker), &CallContext::new())
            .await
            .expect_err("should fail");

        assert_eq!(error.status_code(), Some(StatusCode::SERVICE_UNAVAILABLE));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_retry_transient_failures_with_backoff() {
        init_tracing();
        let transport = ScriptedTransport::new([
            Ok(status(StatusCode::SERVICE_UNAVAILABLE)),
            Err(TransportError::Connect {
                message: "connection reset".to_string(),
            }),
            Ok(status(StatusCode::OK)),
        ]);
        let invoker = invoker(&transport);
        invoker.enable_retries(fast_policy());

        let response = invoker
            .send(request(&invoker), &CallContext::new())
            .await
            .expect("should succeed on third attempt");

        assert_eq!(response.status(), StatusCode::OK);
        let calls = transport.calls();
        assert_eq!(calls.len(), 3);
        let delays: Vec<_> = fast_policy().backoff().collect();
        assert!(calls[1].0 - calls[0].0 >= Duration::from_millis(10));
        assert!(calls[1].0 - calls[0].0 >= delays[0]);
        assert!(calls[2].0 - calls[1].0 >= delays[1]);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_after_max_attempts() {
        init_tracing();
        let transport = ScriptedTransport::new(
            std::iter::repeat_with(|| Ok(status(StatusCode::BAD_GATEWAY))).take(5),
        );
        let invoker = invoker(&transport);
        invoker.enable_retries(fast_policy());

        let error = invoker
            .send(request(&invoker), &CallContext::new())
            .await
            .expect_err("should fail");

        assert_eq!(error.status_code(), Some(StatusCode::BAD_GATEWAY));
        assert_eq!(transport.calls().len(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn should_not_retry_permanent_errors() {
        let transport = ScriptedTransport::new([Ok(status(StatusCode::BAD_REQUEST))]);
        let invoker = invoker(&transport);
        invoker.enable_retries(fast_policy());

        let result = invoker.send(request(&invoker), &CallContext::new()).await;

        let error = result.expect_err("should fail");
        assert!(matches!(error, CallError::Api { .. }));
        assert_eq!(error.status_code(), Some(StatusCode::BAD_REQUEST));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn should_stop_retrying_when_deadline_elapses_during_backoff() {
        let transport = ScriptedTransport::new([
            Ok(status(StatusCode::SERVICE_UNAVAILABLE)),
            Ok(status(StatusCode::OK)),
        ]);
        let invoker = invoker(&transport);
        invoker.enable_retries(
            RetryPolicy::default()
                .with_base_interval(Duration::from_secs(1))
                .with_max_interval(Duration::from_secs(1)),
        );
        let ctx = CallContext::new().with_timeout(Duration::from_millis(100));

        let result = invoker.send(request(&invoker), &ctx).await;

        assert!(matches!(result, Err(CallError::DeadlineExceeded)));
        assert_eq!(transport.calls().len(), 1);
    }

    #[tokio::test]
    async fn should_not_send_when_already_cancelled() {
        let transport = ScriptedTransport::new([]);
        let invoker = invoker(&transport);
        let ctx = CallContext::new();
        ctx.cancellation_token().cancel();

        let result = invoker.send(request(&invoker), &ctx).await;

        assert!(matches!(result, Err(CallError::Cancelled)));
        assert!(transport.calls().is_empty());
    }

    #[tokio::test]
    async fn should_keep_snapshot_for_in_flight_calls() {
        let transport = ScriptedTransport::new([]);
        let invoker = invoker(&transport);
        let before = invoker.config();

        invoker
            .set_service_url("https://other.example.com/v2/")
            .expect("valid url");
        invoker.enable_retries(RetryPolicy::default());

        assert_eq!(before.service_url(), "https://findings.example.com");
        assert!(before.retry().is_none());
        assert_eq!(invoker.service_url(), "https://other.example.com/v2");
        assert!(invoker.config().retry().is_some());

        invoker.disable_retries();
        assert!(invoker.config().retry().is_none());
    }

    #[tokio::test]
    async fn should_send_with_the_snapshot_the_request_was_built_from() {
        let transport = ScriptedTransport::new([]);
        let invoker = invoker(&transport);
        invoker
            .set_default_headers(&CallHeaders::new().add_header("Accept-Language", "en"))
            .expect("valid headers");
        let before = invoker.config();
        let request = request(&invoker);

        invoker
            .set_service_url("https://other.example.com")
            .expect("valid url");
        invoker
            .set_default_headers(&CallHeaders::new().add_header("Accept-Language", "fr"))
            .expect("valid headers");
        invoker
            .send_with_config(&before, request, &CallContext::new())
            .await
            .expect("should succeed");

        let calls = transport.calls();
        let sent = &calls[0].1;
        assert_eq!(
            sent.url().as_str(),
            "https://findings.example.com/v1/a1/notes"
        );
        assert_eq!(header(sent.headers(), "accept-language"), "en");
    }

    #[tokio::test]
    async fn should_let_caller_headers_override_defaults() {
        let transport = ScriptedTransport::new([]);
        let invoker = invoker(&transport);
        invoker
            .set_default_headers(&CallHeaders::new().add_header("Accept-Language", "en"))
            .expect("valid headers");
        let url: Url = "https://findings.example.com/v1"
            .parse()
            .expect("valid url");
        let request = RequestBuilder::new(Method::GET)
            .with_url(url)
            .add_header("User-Agent", "my-app/2.0")
            .build()
            .expect("should build");

        invoker
            .send(request, &CallContext::new())
            .await
            .expect("should succeed");

        let calls = transport.calls();
        let headers = calls[0].1.headers();
        assert_eq!(header(headers, USER_AGENT), "my-app/2.0");
        assert_eq!(header(headers, "accept-language"), "en");
        assert_eq!(header(headers, "x-service-name"), "findings");
    }

    #[test]
    fn should_require_service_url() {
        let result = Invoker::builder().build();

        assert!(matches!(result, Err(CallError::Validation { .. })));
        assert!(matches!(
            Invoker::builder().with_service_url("not a url"),
            Err(CallError::MalformedUrl { .. })
        ));
    }

    #[test]
    fn test_invoker_is_send_and_sync() {
        fn assert_send_sync<T: Send + Sync>() {}

        assert_send_sync::<Invoker>();
    }
}
