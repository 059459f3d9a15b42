//! JSON:API document types for the DataCite `/dois` resource.
//!
//! ```json
//! {
//!   "data": { "id": "10.1234/ab12", "type": "dois", "attributes": { ... } },
//!   "meta": { "tombstone": { "deletedAt": "2024-03-01T10:00:00Z" }, "target": "https://..." }
//! }
//! ```
//!
//! Request and response bodies share one shape. Attributes stay an open
//! [`Attributes`] mapping: the service returns many more fields than the
//! candidate metadata sends, and the field differ only looks at candidate
//! keys.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use pidtools_core::{Attributes, CoreError, Doi, DoiState, MetadataValue, Scalar, StateEvent};
use serde::{Deserialize, Serialize};

/// Media type for every request and response body.
pub const JSONAPI_MEDIA_TYPE: &str = "application/vnd.api+json";

/// JSON:API resource type of DOI records.
pub const DOI_RESOURCE_TYPE: &str = "dois";

fn default_resource_type() -> String {
    DOI_RESOURCE_TYPE.to_string()
}

// -- Documents ----------------------------------------------------------------

/// A top-level JSON:API document carrying one DOI resource.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoiDocument {
    pub data: DoiData,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub meta: Option<DoiMeta>,
}

/// The `data` member.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoiData {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "type", default = "default_resource_type")]
    pub kind: String,
    #[serde(default)]
    pub attributes: Attributes,
}

/// The `meta` member.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DoiMeta {
    /// Present when the service has soft-deleted the record.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
    /// Landing-page URL sent on writes.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target: Option<String>,
}

/// Soft-deletion marker returned with HTTP 410.
///
/// `deletedAt` is kept as sent. It is only interpreted for display, so a
/// record with an odd or missing timestamp still decodes.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Tombstone {
    #[serde(rename = "deletedAt", default, skip_serializing_if = "Option::is_none")]
    pub deleted_at: Option<String>,
}

impl Tombstone {
    /// Deletion date for operator display, e.g. `March 1, 2024`.
    ///
    /// Accepts RFC 3339, a zone-less date-time or a bare date. Anything
    /// else is returned unchanged; `None` when no timestamp was sent.
    pub fn deleted_on(&self) -> Option<String> {
        let raw = self.deleted_at.as_deref().map(str::trim).filter(|s| !s.is_empty())?;
        let date = DateTime::parse_from_rfc3339(raw)
            .map(|dt| dt.date_naive())
            .or_else(|_| {
                NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").map(|dt| dt.date())
            })
            .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"));
        Some(match date {
            Ok(date) => date.format("%B %-d, %Y").to_string(),
            Err(_) => raw.to_string(),
        })
    }
}

impl DoiDocument {
    /// Payload for `POST /dois`: the registrant prefix plus the full
    /// candidate attributes.
    pub fn create(prefix: &str, attributes: Attributes, target: Option<String>) -> Self {
        let mut attributes = attributes;
        attributes.insert("prefix".to_string(), MetadataValue::text(prefix));
        Self::write(None, attributes, target)
    }

    /// Payload for a metadata `PUT /dois/{doi}`: the full candidate.
    pub fn update(doi: &Doi, attributes: Attributes, target: Option<String>) -> Self {
        Self::write(Some(doi), attributes, target)
    }

    /// Payload for a state transition: only the event name is sent.
    pub fn event(doi: &Doi, event: StateEvent, target: Option<String>) -> Self {
        let attributes = Attributes::from([("event".to_string(), MetadataValue::text(event.as_str()))]);
        Self::write(Some(doi), attributes, target)
    }

    fn write(doi: Option<&Doi>, attributes: Attributes, target: Option<String>) -> Self {
        Self {
            data: DoiData {
                id: doi.map(|d| d.to_string()),
                kind: default_resource_type(),
                attributes,
            },
            meta: target.map(|target| DoiMeta {
                tombstone: None,
                target: Some(target),
            }),
        }
    }
}

// -- Records ------------------------------------------------------------------

/// A DOI record as held by the registration service.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DoiRecord {
    pub doi: Doi,
    pub state: DoiState,
    pub attributes: Attributes,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tombstone: Option<Tombstone>,
}

impl DoiRecord {
    /// Interpret a response document.
    ///
    /// The DOI comes from `data.id`, falling back to `attributes.doi`. A
    /// missing or null `state` means `draft`; an unrecognised one is an
    /// error.
    pub fn from_document(document: DoiDocument) -> Result<Self, CoreError> {
        let DoiDocument { data, meta } = document;
        let raw_doi = data
            .id
            .or_else(|| data.attributes.get("doi").and_then(|v| v.as_str()).map(str::to_string))
            .unwrap_or_default();
        let doi = Doi::new(raw_doi)?;

        let state = match data.attributes.get("state") {
            None | Some(MetadataValue::Scalar(Scalar::Null)) => DoiState::Draft,
            Some(MetadataValue::Scalar(Scalar::Text(s))) => s.parse()?,
            Some(other) => {
                return Err(CoreError::UnknownState(
                    serde_json::Value::from(other.clone()).to_string(),
                ))
            }
        };

        Ok(Self {
            doi,
            state,
            attributes: data.attributes,
            tombstone: meta.and_then(|m| m.tombstone),
        })
    }
}
