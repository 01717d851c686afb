use serde::{Deserialize, Serialize};
use wirecall_core::Paginated;

use crate::card::Card;

/// The kind of a note.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum NoteKind {
    /// A finding reported by a provider.
    Finding,
    /// A key performance indicator.
    Kpi,
    /// A dashboard card.
    Card,
    /// A dashboard card that needs configuration.
    CardConfigured,
    /// A dashboard section.
    Section,
}

/// Severity of a finding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    /// Low.
    Low,
    /// Medium.
    Medium,
    /// High.
    High,
    /// Critical.
    Critical,
}

/// The entity that reported a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Reporter {
    /// Reporter identifier.
    pub id: String,
    /// Reporter display name.
    pub title: String,
    /// Reporter web page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// A link related to a note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RelatedUrl {
    /// Link label.
    pub label: String,
    /// Link target.
    pub url: String,
}

/// A step to remediate a finding.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RemediationStep {
    /// Step title.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Step link.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

/// Details of a `FINDING` note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FindingType {
    /// Severity of the finding.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub severity: Option<Severity>,
    /// Remediation steps.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub next_steps: Vec<RemediationStep>,
}

/// Details of a `KPI` note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KpiType {
    /// How occurrences are aggregated, e.g. `SUM`.
    pub aggregation_type: String,
}

/// Details of a `SECTION` note.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Section {
    /// Section title.
    pub title: String,
    /// Section image.
    pub image: String,
}

/// A note: the type definition shared by occurrences.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiNote {
    /// The note kind.
    pub kind: NoteKind,
    /// Note identifier, unique per provider.
    pub id: String,
    /// One sentence description.
    pub short_description: String,
    /// Detailed description.
    pub long_description: String,
    /// Related links.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub related_url: Vec<RelatedUrl>,
    /// Creation time, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub create_time: Option<String>,
    /// Last update time, RFC 3339.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub update_time: Option<String>,
    /// Whether the note is shared across accounts.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shared: Option<bool>,
    /// Who reported the note.
    pub reported_by: Reporter,
    /// Set for `FINDING` notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub finding: Option<FindingType>,
    /// Set for `KPI` notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub kpi: Option<KpiType>,
    /// Set for `CARD` and `CARD_CONFIGURED` notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub card: Option<Card>,
    /// Set for `SECTION` notes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub section: Option<Section>,
}

/// One page of notes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiListNotesResponse {
    /// The notes of this page.
    #[serde(default)]
    pub notes: Vec<ApiNote>,
    /// Token of the next page; absent on the last page.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub next_page_token: Option<String>,
}

impl Paginated for ApiListNotesResponse {
    type Item = ApiNote;

    fn items(&self) -> &[ApiNote] {
        &self.notes
    }

    fn next_page_token(&self) -> Option<&str> {
        self.next_page_token.as_deref()
    }
}
