//! # Wirecall Findings
//!
//! Client of the findings service, built on [`wirecall_core`].
//!
//! The service manages notes: the type definitions of findings, KPIs and
//! dashboard cards reported by providers. Card elements and their value
//! sources are polymorphic, selected by their `kind` field.
//!
//! ```rust,no_run
//! use wirecall_core::CallContext;
//! use wirecall_findings::{FindingsService, GetNoteOptions};
//!
//! # #[tokio::main]
//! # async fn main() -> Result<(), wirecall_core::CallError> {
//! let service = FindingsService::from_env()?;
//! let note = service
//!     .get_note(&GetNoteOptions::new("a1", "p1", "n1"), &CallContext::new())
//!     .await?;
//! println!("{}", note.result().short_description);
//! # Ok(())
//! # }
//! ```

mod card;
mod models;
mod options;
mod pager;
mod service;

#[cfg(test)]
mod testing;

pub use self::card::{
    BreakdownCardElement, Card, CardElement, FindingCountValueType, KpiValueType,
    NumericCardElement, TimeSeriesCardElement, ValueType,
};
pub use self::models::{
    ApiListNotesResponse, ApiNote, FindingType, KpiType, NoteKind, RelatedUrl, RemediationStep,
    Reporter, Section, Severity,
};
pub use self::options::{
    CreateNoteOptions, DeleteNoteOptions, GetNoteOptions, ListNotesOptions, PostGraphOptions,
};
pub use self::pager::NotesPager;
pub use self::service::{DEFAULT_SERVICE_NAME, DEFAULT_SERVICE_URL, FindingsService};
