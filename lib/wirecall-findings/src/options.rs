//! Options of the findings operations.
//!
//! Required path parameters are `Option<String>` fields set by the
//! constructors or the setters; a missing or empty value fails validation
//! before any request is built. Unset optional values are never sent.

use bytes::Bytes;
use wirecall_core::{CallError, CallHeaders, PagedOptions};

use crate::card::Card;
use crate::models::{FindingType, KpiType, NoteKind, RelatedUrl, Reporter, Section};

pub(crate) fn required<'a>(value: Option<&'a String>, name: &str) -> Result<&'a str, CallError> {
    match value {
        Some(value) if !value.is_empty() => Ok(value.as_str()),
        _ => Err(CallError::validation(format!("{name} must be provided"))),
    }
}

/// Options of `list_notes`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ListNotesOptions {
    /// Account identifier.
    pub account_id: Option<String>,
    /// Provider identifier.
    pub provider_id: Option<String>,
    /// Correlation identifier sent as `Transaction-Id`.
    pub transaction_id: Option<String>,
    /// Maximum number of notes per page, at least 2.
    pub page_size: Option<u32>,
    /// Token of the requested page.
    pub page_token: Option<String>,
    /// Extra headers.
    pub headers: CallHeaders,
}

impl ListNotesOptions {
    /// Lists the notes of a provider.
    pub fn new(account_id: impl Into<String>, provider_id: impl Into<String>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            provider_id: Some(provider_id.into()),
            ..Self::default()
        }
    }

    /// Sets the account identifier.
    #[must_use]
    pub fn with_account_id(mut self, account_id: impl Into<String>) -> Self {
        self.account_id = Some(account_id.into());
        self
    }

    /// Sets the provider identifier.
    #[must_use]
    pub fn with_provider_id(mut self, provider_id: impl Into<String>) -> Self {
        self.provider_id = Some(provider_id.into());
        self
    }

    /// Sets the `Transaction-Id` header.
    #[must_use]
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Sets the page size.
    #[must_use]
    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = Some(page_size);
        self
    }

    /// Sets the page token.
    #[must_use]
    pub fn with_page_token(mut self, page_token: impl Into<String>) -> Self {
        self.page_token = Some(page_token.into());
        self
    }

    /// Sets extra headers.
    #[must_use]
    pub fn with_headers(mut self, headers: CallHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub(crate) fn path_params(&self) -> Result<[&str; 2], CallError> {
        Ok([
            required(self.account_id.as_ref(), "accountId")?,
            required(self.provider_id.as_ref(), "providerId")?,
        ])
    }
}

impl PagedOptions for ListNotesOptions {
    fn with_page_token(&self, token: &str) -> Self {
        self.clone().with_page_token(token)
    }
}

/// Options of `get_note`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct GetNoteOptions {
    /// Account identifier.
    pub account_id: Option<String>,
    /// Provider identifier.
    pub provider_id: Option<String>,
    /// Note identifier.
    pub note_id: Option<String>,
    /// Correlation identifier sent as `Transaction-Id`.
    pub transaction_id: Option<String>,
    /// Extra headers.
    pub headers: CallHeaders,
}

impl GetNoteOptions {
    /// Reads one note.
    pub fn new(
        account_id: impl Into<String>,
        provider_id: impl Into<String>,
        note_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: Some(account_id.into()),
            provider_id: Some(provider_id.into()),
            note_id: Some(note_id.into()),
            ..Self::default()
        }
    }

    /// Sets the `Transaction-Id` header.
    #[must_use]
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Sets extra headers.
    #[must_use]
    pub fn with_headers(mut self, headers: CallHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub(crate) fn path_params(&self) -> Result<[&str; 3], CallError> {
        Ok([
            required(self.account_id.as_ref(), "accountId")?,
            required(self.provider_id.as_ref(), "providerId")?,
            required(self.note_id.as_ref(), "noteId")?,
        ])
    }
}

/// Options of `delete_note`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DeleteNoteOptions {
    /// Account identifier.
    pub account_id: Option<String>,
    /// Provider identifier.
    pub provider_id: Option<String>,
    /// Note identifier.
    pub note_id: Option<String>,
    /// Correlation identifier sent as `Transaction-Id`.
    pub transaction_id: Option<String>,
    /// Extra headers.
    pub headers: CallHeaders,
}

impl DeleteNoteOptions {
    /// Deletes one note.
    pub fn new(
        account_id: impl Into<String>,
        provider_id: impl Into<String>,
        note_id: impl Into<String>,
    ) -> Self {
        Self {
            account_id: Some(account_id.into()),
            provider_id: Some(provider_id.into()),
            note_id: Some(note_id.into()),
            ..Self::default()
        }
    }

    /// Sets the `Transaction-Id` header.
    #[must_use]
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    pub(crate) fn path_params(&self) -> Result<[&str; 3], CallError> {
        Ok([
            required(self.account_id.as_ref(), "accountId")?,
            required(self.provider_id.as_ref(), "providerId")?,
            required(self.note_id.as_ref(), "noteId")?,
        ])
    }
}

/// Options of `create_note`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CreateNoteOptions {
    /// Account identifier.
    pub account_id: Option<String>,
    /// Provider identifier.
    pub provider_id: Option<String>,
    /// One sentence description.
    pub short_description: Option<String>,
    /// Detailed description.
    pub long_description: Option<String>,
    /// The note kind.
    pub kind: Option<NoteKind>,
    /// Note identifier, unique per provider.
    pub id: Option<String>,
    /// Who reports the note.
    pub reported_by: Option<Reporter>,
    /// Related links.
    pub related_url: Option<Vec<RelatedUrl>>,
    /// Whether the note is shared across accounts.
    pub shared: Option<bool>,
    /// Details of a `FINDING` note.
    pub finding: Option<FindingType>,
    /// Details of a `KPI` note.
    pub kpi: Option<KpiType>,
    /// Details of a card note.
    pub card: Option<Card>,
    /// Details of a `SECTION` note.
    pub section: Option<Section>,
    /// Correlation identifier sent as `Transaction-Id`.
    pub transaction_id: Option<String>,
    /// Extra headers.
    pub headers: CallHeaders,
}

impl CreateNoteOptions {
    /// Creates a note with its required fields.
    pub fn new(
        account_id: impl Into<String>,
        provider_id: impl Into<String>,
        id: impl Into<String>,
        kind: NoteKind,
        reported_by: Reporter,
    ) -> Self {
        Self {
            account_id: Some(account_id.into()),
            provider_id: Some(provider_id.into()),
            id: Some(id.into()),
            kind: Some(kind),
            reported_by: Some(reported_by),
            ..Self::default()
        }
    }

    /// Sets both descriptions.
    #[must_use]
    pub fn with_descriptions(
        mut self,
        short_description: impl Into<String>,
        long_description: impl Into<String>,
    ) -> Self {
        self.short_description = Some(short_description.into());
        self.long_description = Some(long_description.into());
        self
    }

    /// Sets the finding details.
    #[must_use]
    pub fn with_finding(mut self, finding: FindingType) -> Self {
        self.finding = Some(finding);
        self
    }

    /// Sets the KPI details.
    #[must_use]
    pub fn with_kpi(mut self, kpi: KpiType) -> Self {
        self.kpi = Some(kpi);
        self
    }

    /// Sets the card details.
    #[must_use]
    pub fn with_card(mut self, card: Card) -> Self {
        self.card = Some(card);
        self
    }

    /// Sets the section details.
    #[must_use]
    pub fn with_section(mut self, section: Section) -> Self {
        self.section = Some(section);
        self
    }

    /// Sets the related links.
    #[must_use]
    pub fn with_related_url(mut self, related_url: Vec<RelatedUrl>) -> Self {
        self.related_url = Some(related_url);
        self
    }

    /// Shares the note across accounts.
    #[must_use]
    pub fn with_shared(mut self, shared: bool) -> Self {
        self.shared = Some(shared);
        self
    }

    /// Sets the `Transaction-Id` header.
    #[must_use]
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Sets extra headers.
    #[must_use]
    pub fn with_headers(mut self, headers: CallHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub(crate) fn path_params(&self) -> Result<[&str; 2], CallError> {
        let params = [
            required(self.account_id.as_ref(), "accountId")?,
            required(self.provider_id.as_ref(), "providerId")?,
        ];
        required(self.short_description.as_ref(), "shortDescription")?;
        required(self.long_description.as_ref(), "longDescription")?;
        required(self.id.as_ref(), "id")?;
        if self.kind.is_none() {
            return Err(CallError::validation("kind must be provided"));
        }
        if self.reported_by.is_none() {
            return Err(CallError::validation("reportedBy must be provided"));
        }
        Ok(params)
    }
}

/// Options of `post_graph`.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PostGraphOptions {
    /// Account identifier.
    pub account_id: Option<String>,
    /// The query, sent verbatim.
    pub body: Option<Bytes>,
    /// Content type of the query, `application/graphql` when unset.
    pub content_type: Option<String>,
    /// Correlation identifier sent as `Transaction-Id`.
    pub transaction_id: Option<String>,
    /// Extra headers.
    pub headers: CallHeaders,
}

impl PostGraphOptions {
    /// Runs a graph query.
    pub fn new(account_id: impl Into<String>, body: impl Into<Bytes>) -> Self {
        Self {
            account_id: Some(account_id.into()),
            body: Some(body.into()),
            ..Self::default()
        }
    }

    /// Sets the content type of the query, e.g. `application/json`.
    #[must_use]
    pub fn with_content_type(mut self, content_type: impl Into<String>) -> Self {
        self.content_type = Some(content_type.into());
        self
    }

    /// Sets the `Transaction-Id` header.
    #[must_use]
    pub fn with_transaction_id(mut self, transaction_id: impl Into<String>) -> Self {
        self.transaction_id = Some(transaction_id.into());
        self
    }

    /// Sets extra headers.
    #[must_use]
    pub fn with_headers(mut self, headers: CallHeaders) -> Self {
        self.headers = headers;
        self
    }

    pub(crate) fn path_params(&self) -> Result<[&str; 1], CallError> {
        let params = [required(self.account_id.as_ref(), "accountId")?];
        if self.body.as_ref().is_none_or(Bytes::is_empty) {
            return Err(CallError::validation("body must be provided"));
        }
        Ok(params)
    }
}
