//! # Candidate Metadata Contract
//!
//! The record the metadata assembler produces for a content item. It is
//! rebuilt in full on every lifecycle operation and never persisted.
//!
//! Field names follow the DataCite REST attribute names so that
//! [`CandidateMetadata::to_attributes`] yields exactly the mapping sent to
//! the registration service. The key set is fixed: list-valued fields are
//! always present (possibly empty), and `url` is omitted until a DOI exists.

use serde::{Deserialize, Serialize};

use crate::error::CoreError;
use crate::value::{Attributes, MetadataValue};

/// Locally derived DOI metadata for one content item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CandidateMetadata {
    pub titles: Vec<Title>,
    pub descriptions: Vec<Description>,
    pub creators: Vec<Creator>,
    pub publisher: String,
    pub publication_year: i32,
    pub dates: Vec<DateEntry>,
    pub alternate_identifiers: Vec<AlternateIdentifier>,
    pub formats: Vec<String>,
    pub subjects: Vec<Subject>,
    pub types: ResourceTypes,
    pub language: String,
    pub related_identifiers: Vec<RelatedIdentifier>,
    pub related_items: Vec<RelatedItem>,
    pub version: String,
    /// Resolver URL; present only when a DOI is already associated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub url: Option<String>,
}

impl CandidateMetadata {
    /// The top-level keys every candidate carries, excluding `url`.
    pub const REQUIRED_KEYS: [&'static str; 14] = [
        "titles",
        "descriptions",
        "creators",
        "publisher",
        "publicationYear",
        "dates",
        "alternateIdentifiers",
        "formats",
        "subjects",
        "types",
        "language",
        "relatedIdentifiers",
        "relatedItems",
        "version",
    ];

    /// Render the candidate as a DataCite attribute mapping.
    pub fn to_attributes(&self) -> Result<Attributes, CoreError> {
        let value =
            serde_json::to_value(self).map_err(|e| CoreError::Metadata(e.to_string()))?;
        if !value.is_object() {
            return Err(CoreError::Metadata("expected a JSON object".to_string()));
        }
        Ok(MetadataValue::attributes_from_json(value))
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Title {
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Description {
    pub description: String,
    pub description_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

impl Description {
    /// An `Abstract` description, the type used for item excerpts.
    pub fn abstract_text(description: impl Into<String>, lang: Option<String>) -> Self {
        Self {
            description: description.into(),
            description_type: "Abstract".to_string(),
            lang,
        }
    }
}

/// A person credited as creator.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Creator {
    pub name: String,
    pub given_name: String,
    pub family_name: String,
    pub name_type: String,
    pub name_identifiers: Vec<NameIdentifier>,
    pub affiliation: Vec<Affiliation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NameIdentifier {
    pub name_identifier: String,
    pub name_identifier_scheme: String,
}

impl NameIdentifier {
    /// An ORCID iD name identifier.
    pub fn orcid(id: impl Into<String>) -> Self {
        Self {
            name_identifier: id.into(),
            name_identifier_scheme: "ORCID".to_string(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Affiliation {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DateEntry {
    /// `YYYY-MM-DD`.
    pub date: String,
    /// DataCite date type, e.g. `Created` or `Updated`.
    pub date_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AlternateIdentifier {
    pub alternate_identifier: String,
    pub alternate_identifier_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Subject {
    pub subject: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub lang: Option<String>,
}

/// Resource type classification in the vocabularies DataCite maps to.
///
/// The registration service augments this object with derived sub-fields,
/// which is why `types` is on the differ's default enrichment allow-list.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceTypes {
    pub ris: String,
    pub citeproc: String,
    pub bibtex: String,
    pub schema_org: String,
    pub resource_type: String,
    pub resource_type_general: String,
}

impl Default for ResourceTypes {
    fn default() -> Self {
        Self {
            ris: "BLOG".to_string(),
            citeproc: "webpage".to_string(),
            bibtex: "misc".to_string(),
            schema_org: "BlogPosting".to_string(),
            resource_type: "Blog Post".to_string(),
            resource_type_general: "Text".to_string(),
        }
    }
}

/// A relation to another identified resource.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedIdentifier {
    pub related_identifier: String,
    pub related_identifier_type: String,
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub resource_type_general: Option<String>,
}

impl RelatedIdentifier {
    /// A DOI-typed relation to a textual resource.
    pub fn doi(doi: impl Into<String>, relation_type: impl Into<String>) -> Self {
        Self {
            related_identifier: doi.into(),
            related_identifier_type: "DOI".to_string(),
            relation_type: relation_type.into(),
            resource_type_general: Some("Text".to_string()),
        }
    }
}

/// A related work described inline rather than by identifier alone.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedItem {
    pub related_item_type: String,
    pub relation_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_item_identifier: Option<RelatedItemIdentifier>,
    #[serde(default)]
    pub titles: Vec<Title>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub publication_year: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedItemIdentifier {
    pub related_item_identifier: String,
    pub related_item_identifier_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample(url: Option<String>) -> CandidateMetadata {
        CandidateMetadata {
            titles: vec![Title {
                title: "Report 2024".into(),
                lang: Some("en".into()),
            }],
            descriptions: vec![],
            creators: vec![],
            publisher: "EHRI".into(),
            publication_year: 2024,
            dates: vec![],
            alternate_identifiers: vec![],
            formats: vec!["text/html".into()],
            subjects: vec![],
            types: ResourceTypes::default(),
            language: "en".into(),
            related_identifiers: vec![],
            related_items: vec![],
            version: "1".into(),
            url,
        }
    }

    #[test]
    fn attributes_carry_the_fixed_key_set() {
        let attrs = sample(None).to_attributes().unwrap();
        for key in CandidateMetadata::REQUIRED_KEYS {
            assert!(attrs.contains_key(key), "missing key {key}");
        }
        assert!(!attrs.contains_key("url"));
        assert_eq!(attrs.len(), CandidateMetadata::REQUIRED_KEYS.len());
    }

    #[test]
    fn url_present_once_a_doi_exists() {
        let attrs = sample(Some("https://doi.org/10.1234/ab12".into())).to_attributes().unwrap();
        assert_eq!(
            attrs["url"].as_str(),
            Some("https://doi.org/10.1234/ab12")
        );
    }

    #[test]
    fn empty_sources_yield_empty_lists_not_missing_keys() {
        let attrs = sample(None).to_attributes().unwrap();
        assert_eq!(attrs["creators"].as_list().map(<[_]>::len), Some(0));
        assert_eq!(attrs["relatedItems"].as_list().map(<[_]>::len), Some(0));
    }

    #[test]
    fn nested_names_use_datacite_casing() {
        let attrs = sample(None).to_attributes().unwrap();
        let types = attrs["types"].as_map().unwrap();
        assert!(types.contains_key("resourceTypeGeneral"));
        assert!(types.contains_key("schemaOrg"));
    }
}
