//! # Wirecall Core
//!
//! Typed request pipeline for HTTP/JSON APIs.
//!
//! A call goes through the same stages whatever the operation:
//!
//! 1. a [`PathTemplate`] resolves the route with positional parameters,
//! 2. a [`RequestBuilder`] adds query parameters, headers and a body and
//!    produces an immutable [`RequestDescriptor`],
//! 3. the [`Invoker`] applies default headers, asks its [`Authenticator`] for
//!    credentials and sends the request through its [`Transport`], retrying
//!    transient failures per its [`RetryPolicy`] until the [`CallContext`]
//!    fires,
//! 4. the [`ResponseDecoder`] turns the [`ResponseEnvelope`] into a
//!    [`DetailedResponse`], dispatching variant fields through a
//!    [`VariantRegistry`],
//! 5. list responses implementing [`Paginated`] yield a [`PageCursor`] for the
//!    next call.
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use http::Method;
//! use serde::Deserialize;
//! use wirecall_core::{
//!     Authentication, CallContext, Invoker, PathTemplate, RequestBuilder, ResponseDecoder,
//! };
//!
//! #[derive(Debug, Deserialize)]
//! struct Note {
//!     id: String,
//! }
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let invoker = Invoker::builder()
//!     .with_service_url("https://findings.example.com")?
//!     .with_authenticator(Authentication::Bearer("my-token".into()))
//!     .build()?;
//!
//! let template = PathTemplate::new("/v1/{account_id}/notes/{note_id}");
//! let request = RequestBuilder::new(Method::GET)
//!     .with_route(&invoker.service_url(), &template, &["a1", "n1"])?
//!     .add_header("Accept", "application/json")
//!     .build()?;
//!
//! let envelope = invoker.send(request, &CallContext::new()).await?;
//! let note = ResponseDecoder::decode::<Note>(envelope)?;
//! println!("{}", note.result().id);
//! # Ok(())
//! # }
//! ```
//!
//! ## Errors
//!
//! Every stage reports a [`CallError`]. Errors raised after a response was
//! received keep the [`ResponseEnvelope`], see [`CallError::response`].

mod auth;
mod body;
mod config;
mod context;
mod decode;
mod error;
mod headers;
mod invoker;
mod pagination;
mod path;
mod query;
mod request;
mod response;
mod retry;
mod transport;
mod variant;

pub use self::auth::{
    ApiKeyLocation, Authentication, AuthenticationError, Authenticator, Credential, NoAuth,
    SecureString,
};
pub use self::body::{CallBody, JsonObject};
pub use self::config::{ConfigError, ServiceConfig};
pub use self::context::CallContext;
pub use self::decode::ResponseDecoder;
pub use self::error::CallError;
pub use self::headers::CallHeaders;
pub use self::invoker::{Invoker, InvokerBuilder, InvokerConfig};
pub use self::pagination::{PageCursor, PagedOptions, Paginated};
pub use self::path::PathTemplate;
pub use self::query::CallQuery;
pub use self::request::{RequestBuilder, RequestDescriptor};
pub use self::response::{DetailedResponse, ResponseEnvelope};
pub use self::retry::{RetryPolicy, retry_after};
pub use self::transport::{ReqwestTransport, Transport, TransportError};
pub use self::variant::{
    OverlappingDiscriminator, VariantError, VariantRegistry, VariantRegistryBuilder, VariantSet,
    deserialize_variant,
};
