use std::sync::LazyLock;

use headers::ContentType;
use http::Method;
use tracing::debug;
use wirecall_core::{
    CallContext, CallError, CallHeaders, DetailedResponse, Invoker, InvokerConfig, JsonObject,
    PathTemplate, RequestBuilder, ResponseDecoder, RetryPolicy, ServiceConfig,
};

use crate::models::{ApiListNotesResponse, ApiNote};
use crate::options::{
    CreateNoteOptions, DeleteNoteOptions, GetNoteOptions, ListNotesOptions, PostGraphOptions,
};
use crate::pager::NotesPager;

/// Base URL used when none is configured.
pub const DEFAULT_SERVICE_URL: &str = "https://findings.cloud.example.com/findings";

/// Name of the service, also the prefix of its environment variables.
pub const DEFAULT_SERVICE_NAME: &str = "findings";

const GRAPHQL: &str = "application/graphql";

static NOTES: LazyLock<PathTemplate> =
    LazyLock::new(|| PathTemplate::new("/v1/{account_id}/providers/{provider_id}/notes"));
static NOTE: LazyLock<PathTemplate> =
    LazyLock::new(|| PathTemplate::new("/v1/{account_id}/providers/{provider_id}/notes/{note_id}"));
static GRAPH: LazyLock<PathTemplate> =
    LazyLock::new(|| PathTemplate::new("/v1/{account_id}/graph"));

/// Client of the findings service.
///
/// ```rust,no_run
/// use wirecall_core::CallContext;
/// use wirecall_findings::{FindingsService, ListNotesOptions};
///
/// # #[tokio::main]
/// # async fn main() -> Result<(), wirecall_core::CallError> {
/// // Reads FINDINGS_URL, FINDINGS_AUTH_TYPE, ...
/// let service = FindingsService::from_env()?;
///
/// let options = ListNotesOptions::new("a1", "p1").with_page_size(50);
/// let notes = service.notes_pager(options).collect_all(&CallContext::new()).await?;
/// println!("{} notes", notes.len());
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct FindingsService {
    invoker: Invoker,
}

impl FindingsService {
    /// Wraps a configured invoker.
    pub fn new(invoker: Invoker) -> Self {
        Self { invoker }
    }

    /// Configures the service from `FINDINGS_*` environment variables.
    ///
    /// # Errors
    ///
    /// [`CallError::Config`] for invalid variables, [`CallError::MalformedUrl`] for an invalid URL.
    pub fn from_env() -> Result<Self, CallError> {
        Self::from_config(ServiceConfig::from_env(DEFAULT_SERVICE_NAME)?)
    }

    /// Configures the service from resolved settings, falling back to [`DEFAULT_SERVICE_URL`].
    ///
    /// # Errors
    ///
    /// [`CallError::MalformedUrl`] for an invalid URL.
    pub fn from_config(config: ServiceConfig) -> Result<Self, CallError> {
        let builder = Invoker::builder()
            .with_service_url(DEFAULT_SERVICE_URL)?
            .with_service(DEFAULT_SERVICE_NAME, env!("CARGO_PKG_VERSION"));
        let invoker = config.apply(builder)?.build()?;
        Ok(Self::new(invoker))
    }

    /// The underlying invoker.
    pub fn invoker(&self) -> &Invoker {
        &self.invoker
    }

    /// Replaces the base URL for later calls.
    ///
    /// # Errors
    ///
    /// [`CallError::MalformedUrl`] for an invalid URL.
    pub fn set_service_url(&self, service_url: &str) -> Result<(), CallError> {
        self.invoker.set_service_url(service_url)
    }

    /// Enables retries of transient failures.
    pub fn enable_retries(&self, policy: RetryPolicy) {
        self.invoker.enable_retries(policy);
    }

    /// Disables retries.
    pub fn disable_retries(&self) {
        self.invoker.disable_retries();
    }

    fn request(
        config: &InvokerConfig,
        method: Method,
        template: &PathTemplate,
        params: &[&str],
        transaction_id: Option<&String>,
        headers: &CallHeaders,
    ) -> Result<RequestBuilder, CallError> {
        let builder = RequestBuilder::new(method)
            .with_route(config.service_url(), template, params)?
            .add_header("Accept", "application/json");
        let builder = match transaction_id {
            Some(transaction_id) => builder.add_header("Transaction-Id", transaction_id.clone()),
            None => builder,
        };
        Ok(builder.with_headers(headers.clone()))
    }

    /// Lists the notes of a provider, one page at a time.
    ///
    /// # Errors
    ///
    /// [`CallError::Validation`] for missing identifiers, any other [`CallError`] from the call.
    pub async fn list_notes(
        &self,
        options: &ListNotesOptions,
        ctx: &CallContext,
    ) -> Result<DetailedResponse<ApiListNotesResponse>, CallError> {
        let params = options.path_params()?;
        let config = self.invoker.config();
        let request = Self::request(
            &config,
            Method::GET,
            &NOTES,
            &params,
            options.transaction_id.as_ref(),
            &options.headers,
        )?
        .add_optional_query("page_size", options.page_size)
        .add_optional_query("page_token", options.page_token.as_deref())
        .build()?;

        let envelope = self.invoker.send_with_config(&config, request, ctx).await?;
        let response = ResponseDecoder::decode::<ApiListNotesResponse>(envelope)?;
        debug!(notes = response.result().notes.len(), "notes listed");
        Ok(response)
    }

    /// Iterates over every note of a provider.
    pub fn notes_pager(&self, options: ListNotesOptions) -> NotesPager {
        NotesPager::new(self.clone(), options)
    }

    /// Reads one note.
    ///
    /// # Errors
    ///
    /// [`CallError::Validation`] for missing identifiers, any other [`CallError`] from the call.
    pub async fn get_note(
        &self,
        options: &GetNoteOptions,
        ctx: &CallContext,
    ) -> Result<DetailedResponse<ApiNote>, CallError> {
        let params = options.path_params()?;
        let config = self.invoker.config();
        let request = Self::request(
            &config,
            Method::GET,
            &NOTE,
            &params,
            options.transaction_id.as_ref(),
            &options.headers,
        )?
        .build()?;

        let envelope = self.invoker.send_with_config(&config, request, ctx).await?;
        ResponseDecoder::decode(envelope)
    }

    /// Creates a note.
    ///
    /// # Errors
    ///
    /// [`CallError::Validation`] for missing fields, any other [`CallError`] from the call.
    pub async fn create_note(
        &self,
        options: &CreateNoteOptions,
        ctx: &CallContext,
    ) -> Result<DetailedResponse<ApiNote>, CallError> {
        let params = options.path_params()?;
        let body = JsonObject::new()
            .optional_field("short_description", options.short_description.as_ref())?
            .optional_field("long_description", options.long_description.as_ref())?
            .optional_field("kind", options.kind)?
            .optional_field("id", options.id.as_ref())?
            .optional_field("reported_by", options.reported_by.as_ref())?
            .optional_field("related_url", options.related_url.as_ref())?
            .optional_field("shared", options.shared)?
            .optional_field("finding", options.finding.as_ref())?
            .optional_field("kpi", options.kpi.as_ref())?
            .optional_field("card", options.card.as_ref())?
            .optional_field("section", options.section.as_ref())?;
        let config = self.invoker.config();
        let request = Self::request(
            &config,
            Method::POST,
            &NOTES,
            &params,
            options.transaction_id.as_ref(),
            &options.headers,
        )?
        .with_json_object(body)
        .build()?;

        let envelope = self.invoker.send_with_config(&config, request, ctx).await?;
        ResponseDecoder::decode(envelope)
    }

    /// Deletes a note.
    ///
    /// # Errors
    ///
    /// [`CallError::Validation`] for missing identifiers, any other [`CallError`] from the call.
    pub async fn delete_note(
        &self,
        options: &DeleteNoteOptions,
        ctx: &CallContext,
    ) -> Result<DetailedResponse<()>, CallError> {
        let params = options.path_params()?;
        let config = self.invoker.config();
        let request = Self::request(
            &config,
            Method::DELETE,
            &NOTE,
            &params,
            options.transaction_id.as_ref(),
            &options.headers,
        )?
        .build()?;

        let envelope = self.invoker.send_with_config(&config, request, ctx).await?;
        ResponseDecoder::decode_empty(envelope)
    }

    /// Runs a graph query; the body is sent verbatim.
    ///
    /// # Errors
    ///
    /// [`CallError::Validation`] for a missing account or body,
    /// [`CallError::Encoding`] for an invalid content type, any other [`CallError`] from the call.
    pub async fn post_graph(
        &self,
        options: &PostGraphOptions,
        ctx: &CallContext,
    ) -> Result<DetailedResponse<()>, CallError> {
        let params = options.path_params()?;
        let content_type = options.content_type.as_deref().unwrap_or(GRAPHQL);
        let content_type = content_type
            .parse::<mime::Mime>()
            .map(ContentType::from)
            .map_err(|err| {
                CallError::encoding(format!("invalid content type '{content_type}': {err}"))
            })?;
        let body = options.body.clone().unwrap_or_default();
        let config = self.invoker.config();
        let request = Self::request(
            &config,
            Method::POST,
            &GRAPH,
            &params,
            options.transaction_id.as_ref(),
            &options.headers,
        )?
        .with_raw(body, content_type)
        .build()?;

        let envelope = self.invoker.send_with_config(&config, request, ctx).await?;
        ResponseDecoder::decode_empty(envelope)
    }
}

#[cfg(test)]
mod tests {
    use http::StatusCode;
    use serde_json::json;
    use wirecall_core::{ServiceConfig, VariantSet};

    use super::*;
    use crate::card::{CardElement, ValueType};
    use crate::models::{NoteKind, Reporter};
    use crate::testing::{SpyTransport, json_response, service};

    fn note_json(id: &str) -> serde_json::Value {
        json!({
            "kind": "FINDING",
            "id": id,
            "short_description": "Open port",
            "long_description": "Port 22 is open",
            "reported_by": {"id": "scanner", "title": "Scanner"},
            "finding": {"severity": "HIGH"}
        })
    }

    #[tokio::test]
    async fn should_not_send_invalid_options() {
        let spy = SpyTransport::new([]);
        let service = service(&spy);

        let options = ListNotesOptions::default().with_provider_id("p1");
        let ctx = CallContext::new();

        let result = service.list_notes(&options, &ctx).await;
        let missing_note = service
            .get_note(&GetNoteOptions::new("a1", "p1", ""), &ctx)
            .await;

        assert!(matches!(result, Err(CallError::Validation { .. })));
        assert!(matches!(missing_note, Err(CallError::Validation { .. })));
        assert_eq!(spy.request_count(), 0);
    }

    #[tokio::test]
    async fn should_escape_path_parameters() {
        let spy = SpyTransport::new([json_response(StatusCode::OK, &note_json("n 1"))]);
        let service = service(&spy);

        let response = service
            .get_note(&GetNoteOptions::new("a1", "p1", "n 1"), &CallContext::new())
            .await
            .expect("should succeed");

        assert_eq!(response.result().id, "n 1");
        let requests = spy.requests();
        assert_eq!(requests[0].method(), Method::GET);
        assert_eq!(
            requests[0].url().path(),
            "/findings/v1/a1/providers/p1/notes/n%201"
        );
    }

    #[tokio::test]
    async fn should_only_send_set_query_parameters() {
        let spy = SpyTransport::new([
            json_response(StatusCode::OK, &json!({"notes": []})),
            json_response(StatusCode::OK, &json!({"notes": []})),
        ]);
        let service = service(&spy);
        let paged = ListNotesOptions::new("a1", "p1")
            .with_page_size(2)
            .with_page_token("tok");
        let ctx = CallContext::new();

        service
            .list_notes(&paged, &ctx)
            .await
            .expect("should succeed");
        service
            .list_notes(&ListNotesOptions::new("a1", "p1"), &ctx)
            .await
            .expect("should succeed");

        let requests = spy.requests();
        assert_eq!(
            requests[0].url().query(),
            Some("page_size=2&page_token=tok")
        );
        assert_eq!(requests[1].url().query(), None);
    }

    #[tokio::test]
    async fn should_send_caller_headers_over_provenance() {
        let spy = SpyTransport::new([json_response(StatusCode::OK, &note_json("n1"))]);
        let service = service(&spy);
        let options = GetNoteOptions::new("a1", "p1", "n1")
            .with_transaction_id("tx-1")
            .with_headers(CallHeaders::new().add_header("X-Service-Name", "audit"));

        service
            .get_note(&options, &CallContext::new())
            .await
            .expect("should succeed");

        let requests = spy.requests();
        let headers = requests[0].headers();
        let transaction_id = headers.get("transaction-id").map(|value| value.as_bytes());
        let service_name = headers.get("x-service-name").map(|value| value.as_bytes());
        assert_eq!(transaction_id, Some(b"tx-1".as_slice()));
        assert_eq!(service_name, Some(b"audit".as_slice()));
        assert!(
            headers
                .get("user-agent")
                .and_then(|value| value.to_str().ok())
                .is_some_and(|agent| agent.starts_with("wirecall/") && agent.contains("(findings/"))
        );
    }

    #[tokio::test]
    async fn should_create_note_without_null_fields() {
        let spy = SpyTransport::new([json_response(StatusCode::CREATED, &note_json("n1"))]);
        let service = service(&spy);
        let reporter = Reporter {
            id: "scanner".to_string(),
            title: "Scanner".to_string(),
            url: None,
        };
        let options = CreateNoteOptions::new("a1", "p1", "n1", NoteKind::Finding, reporter)
            .with_descriptions("Open port", "Port 22 is open");

        let response = service
            .create_note(&options, &CallContext::new())
            .await
            .expect("should succeed");

        assert_eq!(response.status(), StatusCode::CREATED);
        let requests = spy.requests();
        assert_eq!(requests[0].method(), Method::POST);
        assert_eq!(
            requests[0].content_type().map(|value| value.as_bytes()),
            Some(b"application/json".as_slice())
        );
        let body = requests[0].body().expect("json body");
        let sent: serde_json::Value = serde_json::from_slice(body).expect("valid json");
        assert_eq!(
            sent,
            json!({
                "id": "n1",
                "kind": "FINDING",
                "short_description": "Open port",
                "long_description": "Port 22 is open",
                "reported_by": {"id": "scanner", "title": "Scanner"}
            })
        );
    }

    #[tokio::test]
    async fn should_post_graph_query_verbatim() {
        let spy = SpyTransport::new([json_response(StatusCode::OK, &json!({}))]);
        let service = service(&spy);

        service
            .post_graph(
                &PostGraphOptions::new("a1", "{ findings { id } }"),
                &CallContext::new(),
            )
            .await
            .expect("should succeed");

        let requests = spy.requests();
        assert_eq!(requests[0].url().path(), "/findings/v1/a1/graph");
        assert_eq!(
            requests[0].content_type().map(|value| value.as_bytes()),
            Some(b"application/graphql".as_slice())
        );
        assert_eq!(
            requests[0].body().map(|body| body.as_ref()),
            Some(b"{ findings { id } }".as_slice())
        );
    }

    #[tokio::test]
    async fn should_delete_note() {
        let spy = SpyTransport::new([json_response(StatusCode::OK, &json!({}))]);
        let service = service(&spy);

        let options = DeleteNoteOptions::new("a1", "p1", "n1");

        let response = service
            .delete_note(&options, &CallContext::new())
            .await
            .expect("should succeed");

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(spy.requests()[0].method(), Method::DELETE);
    }

    #[tokio::test]
    async fn should_decode_card_variants_end_to_end() {
        let card_note = json!({
            "kind": "CARD",
            "id": "c1",
            "short_description": "Summary",
            "long_description": "Summary of the findings",
            "reported_by": {"id": "scanner", "title": "Scanner"},
            "card": {
                "section": "Overview",
                "title": "Findings",
                "subtitle": "Today",
                "finding_note_names": ["n1"],
                "elements": [{
                    "kind": "NUMERIC",
                    "text": "Open",
                    "value_type": {
                        "kind": "FINDING_COUNT",
                        "finding_note_names": ["n1"],
                        "text": "t"
                    }
                }]
            }
        });
        let spy = SpyTransport::new([json_response(StatusCode::OK, &card_note)]);
        let service = service(&spy);

        let response = service
            .get_note(&GetNoteOptions::new("a1", "p1", "c1"), &CallContext::new())
            .await
            .expect("should succeed");

        let card = response.into_result().card.expect("card note");
        let Some(CardElement::Numeric(element)) = card.elements.first() else {
            panic!("unexpected elements {:?}", card.elements);
        };
        let ValueType::FindingCount(count) = &element.value_type else {
            panic!("unexpected value type {:?}", element.value_type);
        };
        assert_eq!(count.finding_note_names, ["n1"]);
    }

    #[tokio::test]
    async fn should_report_unknown_nested_variant() {
        let card_note = json!({
            "kind": "CARD",
            "id": "c1",
            "short_description": "Summary",
            "long_description": "Summary of the findings",
            "reported_by": {"id": "scanner", "title": "Scanner"},
            "card": {
                "section": "Overview",
                "title": "Findings",
                "subtitle": "Today",
                "finding_note_names": [],
                "elements": [{
                    "kind": "BREAKDOWN",
                    "text": "By kind",
                    "value_types": [{"kind": "BOGUS", "text": "?"}]
                }]
            }
        });
        let spy = SpyTransport::new([json_response(StatusCode::OK, &card_note)]);
        let service = service(&spy);

        let error = service
            .get_note(&GetNoteOptions::new("a1", "p1", "c1"), &CallContext::new())
            .await
            .expect_err("should fail");

        let CallError::UnknownVariant { path, message, .. } = &error else {
            panic!("unexpected error {error:?}");
        };
        assert_eq!(path, "card.elements[0]");
        assert!(message.contains("BOGUS"));
        let expected = ValueType::registry().values();
        assert!(expected.iter().all(|value| message.contains(*value)));
    }

    #[tokio::test]
    async fn should_keep_envelope_of_malformed_body() {
        let spy = SpyTransport::new([crate::testing::raw_response(
            StatusCode::OK,
            "} this is not valid json {",
        )]);
        let service = service(&spy);

        let error = service
            .get_note(&GetNoteOptions::new("a1", "p1", "n1"), &CallContext::new())
            .await
            .expect_err("should fail");

        assert!(matches!(error, CallError::MalformedResponse { .. }));
        let response = error.response().expect("envelope is kept");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn should_surface_api_error_message() {
        let body = json!({"errors": [{"code": "not_found", "message": "Note n1 not found"}]});
        let spy = SpyTransport::new([json_response(StatusCode::NOT_FOUND, &body)]);
        let service = service(&spy);

        let error = service
            .get_note(&GetNoteOptions::new("a1", "p1", "n1"), &CallContext::new())
            .await
            .expect_err("should fail");

        insta::assert_snapshot!(error, @"Note n1 not found");
        assert_eq!(error.status_code(), Some(StatusCode::NOT_FOUND));
    }

    #[test]
    fn should_use_configured_url() {
        let config = ServiceConfig::from_lookup("findings", |name| {
            (name == "FINDINGS_URL").then(|| "https://eu.findings.example.com/".to_string())
        })
        .expect("valid config");

        let service = FindingsService::from_config(config).expect("should build");
        let fallback = FindingsService::from_config(
            ServiceConfig::from_lookup("findings", |_| None).expect("valid config"),
        )
        .expect("should build");

        assert_eq!(
            service.invoker().service_url(),
            "https://eu.findings.example.com"
        );
        assert_eq!(fallback.invoker().service_url(), DEFAULT_SERVICE_URL);
    }
}
