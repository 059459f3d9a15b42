//! # Metadata Assembly
//!
//! [`MetadataAssembler`] is the contract the lifecycle manager consumes: a
//! full [`CandidateMetadata`] for a content item, rebuilt on every call, and
//! the item's landing-page URL.
//!
//! [`ContentItemAssembler`] implements it over a [`ContentCatalog`] of
//! content items plus the local association and version-link stores, which
//! supply the DOIs of translations and of previous/next versions.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use pidtools_core::{
    Affiliation, AlternateIdentifier, CandidateMetadata, ContentItemId, Creator, DateEntry,
    Description, Doi, NameIdentifier, RelatedIdentifier, RelatedItem, ResourceTypes, Subject,
    Title,
};
use serde::{Deserialize, Serialize};

use crate::association::{AssociationStore, VersionLinkStore};
use crate::error::AssemblyError;

/// Builds candidate metadata for content items.
pub trait MetadataAssembler: Send + Sync {
    /// Assemble the full candidate. `url` is set only when `doi` is given.
    fn assemble(
        &self,
        item: ContentItemId,
        doi: Option<&Doi>,
    ) -> Result<CandidateMetadata, AssemblyError>;

    /// Landing-page URL sent as `meta.target` on writes.
    fn target_url(&self, item: ContentItemId) -> Result<String, AssemblyError>;
}

// ---------------------------------------------------------------------------
// Content items
// ---------------------------------------------------------------------------

/// Publication status of a content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PublicationStatus {
    #[default]
    Draft,
    Published,
}

/// An author of a content item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Author {
    pub given_name: String,
    pub family_name: String,
    /// Defaults to "given family".
    #[serde(default)]
    pub display_name: Option<String>,
    #[serde(default)]
    pub orcid: Option<String>,
    #[serde(default)]
    pub affiliations: Vec<String>,
}

impl Author {
    pub fn display_name(&self) -> String {
        match &self.display_name {
            Some(name) if !name.trim().is_empty() => name.clone(),
            _ => format!("{} {}", self.given_name, self.family_name)
                .trim()
                .to_string(),
        }
    }
}

/// The content-repository attributes metadata is derived from.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContentItem {
    pub id: ContentItemId,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub authors: Vec<Author>,
    #[serde(default)]
    pub status: PublicationStatus,
    #[serde(default)]
    pub published_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub modified_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub slug: Option<String>,
    /// Two-letter language code.
    #[serde(default)]
    pub language: Option<String>,
    #[serde(default)]
    pub tags: Vec<String>,
    /// Items holding translations of this one.
    #[serde(default)]
    pub translations: Vec<ContentItemId>,
    #[serde(default)]
    pub related_items: Vec<RelatedItem>,
    #[serde(default)]
    pub version: Option<String>,
    pub permalink: String,
}

impl ContentItem {
    pub fn is_published(&self) -> bool {
        self.status == PublicationStatus::Published
    }
}

/// Read access to content items.
pub trait ContentCatalog: Send + Sync {
    fn item(&self, id: ContentItemId) -> Option<ContentItem>;
    fn items(&self) -> Vec<ContentItem>;
}

/// Catalog held in memory, ordered by item id.
#[derive(Debug, Clone, Default)]
pub struct InMemoryCatalog {
    items: BTreeMap<ContentItemId, ContentItem>,
}

impl InMemoryCatalog {
    pub fn new(items: impl IntoIterator<Item = ContentItem>) -> Self {
        Self {
            items: items.into_iter().map(|i| (i.id, i)).collect(),
        }
    }

    pub fn insert(&mut self, item: ContentItem) {
        self.items.insert(item.id, item);
    }
}

impl ContentCatalog for InMemoryCatalog {
    fn item(&self, id: ContentItemId) -> Option<ContentItem> {
        self.items.get(&id).cloned()
    }

    fn items(&self) -> Vec<ContentItem> {
        self.items.values().cloned().collect()
    }
}

// ---------------------------------------------------------------------------
// AssemblerConfig
// ---------------------------------------------------------------------------

/// Site-wide inputs to metadata assembly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssemblerConfig {
    pub publisher: String,
    #[serde(default = "AssemblerConfig::default_resolver_url_prefix")]
    pub resolver_url_prefix: String,
    #[serde(default = "AssemblerConfig::default_language")]
    pub default_language: String,
    #[serde(default)]
    pub resource_types: ResourceTypes,
    #[serde(default = "AssemblerConfig::default_formats")]
    pub formats: Vec<String>,
}

impl AssemblerConfig {
    pub fn new(publisher: impl Into<String>) -> Self {
        Self {
            publisher: publisher.into(),
            resolver_url_prefix: Self::default_resolver_url_prefix(),
            default_language: Self::default_language(),
            resource_types: ResourceTypes::default(),
            formats: Self::default_formats(),
        }
    }

    fn default_resolver_url_prefix() -> String {
        "https://doi.org/".to_string()
    }

    fn default_language() -> String {
        "en".to_string()
    }

    fn default_formats() -> Vec<String> {
        vec!["text/html".to_string()]
    }

    /// Resolver URL for `doi`.
    pub fn resolver_url(&self, doi: &Doi) -> String {
        format!("{}{}", self.resolver_url_prefix, doi)
    }
}

// ---------------------------------------------------------------------------
// ContentItemAssembler
// ---------------------------------------------------------------------------

/// Assembles candidate metadata from catalog content items.
pub struct ContentItemAssembler {
    config: AssemblerConfig,
    catalog: Arc<dyn ContentCatalog>,
    associations: Arc<dyn AssociationStore>,
    versions: Arc<dyn VersionLinkStore>,
    today: Option<NaiveDate>,
}

impl std::fmt::Debug for ContentItemAssembler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ContentItemAssembler")
            .field("config", &self.config)
            .field("today", &self.today)
            .finish_non_exhaustive()
    }
}

impl ContentItemAssembler {
    pub fn new(
        config: AssemblerConfig,
        catalog: Arc<dyn ContentCatalog>,
        associations: Arc<dyn AssociationStore>,
        versions: Arc<dyn VersionLinkStore>,
    ) -> Self {
        Self {
            config,
            catalog,
            associations,
            versions,
            today: None,
        }
    }

    /// Fix the date used for unpublished items' publication year.
    pub fn with_today(mut self, today: NaiveDate) -> Self {
        self.today = Some(today);
        self
    }

    pub fn config(&self) -> &AssemblerConfig {
        &self.config
    }

    fn today(&self) -> NaiveDate {
        self.today.unwrap_or_else(|| Utc::now().date_naive())
    }

    fn lookup(&self, id: ContentItemId) -> Result<ContentItem, AssemblyError> {
        self.catalog.item(id).ok_or(AssemblyError::UnknownItem(id))
    }

    fn language(&self, item: &ContentItem) -> String {
        item.language
            .as_deref()
            .map(str::trim)
            .filter(|l| !l.is_empty())
            .unwrap_or(self.config.default_language.as_str())
            .to_string()
    }

    fn creators(item: &ContentItem) -> Vec<Creator> {
        item.authors
            .iter()
            .map(|author| Creator {
                name: author.display_name(),
                given_name: author.given_name.clone(),
                family_name: author.family_name.clone(),
                name_type: "Personal".to_string(),
                name_identifiers: author
                    .orcid
                    .iter()
                    .filter(|o| !o.trim().is_empty())
                    .map(|o| NameIdentifier::orcid(o.trim()))
                    .collect(),
                affiliation: author
                    .affiliations
                    .iter()
                    .map(|name| Affiliation { name: name.clone() })
                    .collect(),
            })
            .collect()
    }

    fn publication_year(&self, item: &ContentItem) -> i32 {
        match (item.is_published(), item.published_at) {
            (true, Some(published)) => published.year(),
            _ => self.today().year(),
        }
    }

    fn dates(item: &ContentItem) -> Vec<DateEntry> {
        if !item.is_published() {
            return Vec::new();
        }
        let mut dates = Vec::new();
        if let Some(published) = item.published_at {
            dates.push(DateEntry {
                date: published.format("%Y-%m-%d").to_string(),
                date_type: "Created".to_string(),
            });
        }
        if let Some(modified) = item.modified_at {
            dates.push(DateEntry {
                date: modified.format("%Y-%m-%d").to_string(),
                date_type: "Updated".to_string(),
            });
        }
        dates
    }

    fn alternate_identifiers(item: &ContentItem) -> Vec<AlternateIdentifier> {
        let mut ids = vec![AlternateIdentifier {
            alternate_identifier: item.id.to_string(),
            alternate_identifier_type: "Item ID".to_string(),
        }];
        if let Some(slug) = item.slug.as_deref().filter(|s| !s.is_empty()) {
            ids.push(AlternateIdentifier {
                alternate_identifier: slug.to_string(),
                alternate_identifier_type: "Slug".to_string(),
            });
        }
        ids
    }

    fn associated_doi(&self, item: ContentItemId) -> Result<Option<Doi>, AssemblyError> {
        Ok(self.associations.get(item)?.map(|a| a.doi))
    }

    fn related_identifiers(
        &self,
        item: &ContentItem,
    ) -> Result<Vec<RelatedIdentifier>, AssemblyError> {
        let mut related = Vec::new();
        for translation in item.translations.iter().filter(|t| **t != item.id) {
            if let Some(doi) = self.associated_doi(*translation)? {
                related.push(RelatedIdentifier::doi(doi, "HasTranslation"));
            }
        }
        if let Some(next) = self.versions.replaced_by(item.id)? {
            if let Some(doi) = self.associated_doi(next)? {
                related.push(RelatedIdentifier::doi(doi, "IsPreviousVersionOf"));
            }
        }
        for previous in self.versions.replaces(item.id)? {
            if let Some(doi) = self.associated_doi(previous)? {
                related.push(RelatedIdentifier::doi(doi, "IsNewVersionOf"));
            }
        }
        Ok(related)
    }
}

impl MetadataAssembler for ContentItemAssembler {
    fn assemble(
        &self,
        id: ContentItemId,
        doi: Option<&Doi>,
    ) -> Result<CandidateMetadata, AssemblyError> {
        let item = self.lookup(id)?;
        let language = self.language(&item);

        let descriptions = match clean_text(&item.excerpt) {
            excerpt if excerpt.is_empty() => Vec::new(),
            excerpt => vec![Description::abstract_text(excerpt, Some(language.clone()))],
        };

        Ok(CandidateMetadata {
            titles: vec![Title {
                title: clean_text(&item.title),
                lang: Some(language.clone()),
            }],
            descriptions,
            creators: Self::creators(&item),
            publisher: self.config.publisher.clone(),
            publication_year: self.publication_year(&item),
            dates: Self::dates(&item),
            alternate_identifiers: Self::alternate_identifiers(&item),
            formats: self.config.formats.clone(),
            subjects: item
                .tags
                .iter()
                .map(|tag| Subject {
                    subject: tag.clone(),
                    lang: Some(language.clone()),
                })
                .collect(),
            types: self.config.resource_types.clone(),
            related_identifiers: self.related_identifiers(&item)?,
            related_items: item.related_items.clone(),
            version: item.version.clone().unwrap_or_else(|| "1".to_string()),
            url: doi.map(|d| self.config.resolver_url(d)),
            language,
        })
    }

    fn target_url(&self, item: ContentItemId) -> Result<String, AssemblyError> {
        Ok(self.lookup(item)?.permalink)
    }
}

// ---------------------------------------------------------------------------
// Text cleaning
// ---------------------------------------------------------------------------

/// Strip HTML tags, decode common entities and collapse whitespace.
pub fn clean_text(input: &str) -> String {
    let mut stripped = String::with_capacity(input.len());
    let mut in_tag = false;
    for c in input.chars() {
        match (in_tag, c) {
            (false, '<') => in_tag = true,
            (true, '>') => {
                in_tag = false;
                stripped.push(' ');
            }
            (false, c) => stripped.push(c),
            (true, _) => {}
        }
    }
    decode_entities(&stripped)
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

fn decode_entities(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut rest = input;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        match tail.find(';').filter(|end| *end <= 10) {
            Some(end) => match decode_entity(&tail[1..end]) {
                Some(c) => {
                    out.push(c);
                    rest = &tail[end + 1..];
                }
                None => {
                    out.push('&');
                    rest = &tail[1..];
                }
            },
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some(' '),
        "ndash" => Some('\u{2013}'),
        "mdash" => Some('\u{2014}'),
        "hellip" => Some('\u{2026}'),
        "lsquo" => Some('\u{2018}'),
        "rsquo" => Some('\u{2019}'),
        "ldquo" => Some('\u{201C}'),
        "rdquo" => Some('\u{201D}'),
        _ => {
            let code = if let Some(hex) = name
                .strip_prefix("#x")
                .or_else(|| name.strip_prefix("#X"))
            {
                u32::from_str_radix(hex, 16).ok()?
            } else {
                name.strip_prefix('#')?.parse().ok()?
            };
            char::from_u32(code)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::{InMemoryStore, LocalAssociation};
    use chrono::TimeZone;
    use pidtools_core::DoiState;

    fn item(id: u64) -> ContentItem {
        ContentItem {
            id: ContentItemId(id),
            title: format!("Item {id}"),
            excerpt: String::new(),
            authors: vec![],
            status: PublicationStatus::Draft,
            published_at: None,
            modified_at: None,
            slug: None,
            language: None,
            tags: vec![],
            translations: vec![],
            related_items: vec![],
            version: None,
            permalink: format!("https://blog.example/?p={id}"),
        }
    }

    fn assembler(items: Vec<ContentItem>, store: InMemoryStore) -> ContentItemAssembler {
        let store = Arc::new(store);
        ContentItemAssembler::new(
            AssemblerConfig::new("EHRI"),
            Arc::new(InMemoryCatalog::new(items)),
            store.clone(),
            store,
        )
        .with_today(NaiveDate::from_ymd_opt(2025, 6, 1).unwrap())
    }

    fn link(store: &InMemoryStore, item: u64, doi: &str) {
        store
            .set(LocalAssociation {
                item: ContentItemId(item),
                doi: Doi::new(doi).unwrap(),
                state: Some(DoiState::Findable),
            })
            .unwrap();
    }

    #[test]
    fn published_item_yields_full_candidate() {
        let mut report = item(42);
        report.title = "Report <em>2024</em> &amp; more".into();
        report.excerpt = "<p>A short&nbsp;summary.</p>".into();
        report.status = PublicationStatus::Published;
        report.published_at = Some(Utc.with_ymd_and_hms(2024, 3, 5, 9, 0, 0).unwrap());
        report.modified_at = Some(Utc.with_ymd_and_hms(2024, 4, 1, 9, 0, 0).unwrap());
        report.slug = Some("report-2024".into());
        report.language = Some("de".into());
        report.tags = vec!["archives".into()];
        report.authors = vec![Author {
            given_name: "Ada".into(),
            family_name: "Lovelace".into(),
            display_name: None,
            orcid: Some("0000-0002-1825-0097".into()),
            affiliations: vec!["EHRI".into()],
        }];

        let candidate = assembler(vec![report], InMemoryStore::new())
            .assemble(ContentItemId(42), None)
            .unwrap();

        assert_eq!(candidate.titles[0].title, "Report 2024 & more");
        assert_eq!(candidate.titles[0].lang.as_deref(), Some("de"));
        assert_eq!(candidate.descriptions[0].description, "A short summary.");
        assert_eq!(candidate.publication_year, 2024);
        assert_eq!(candidate.dates.len(), 2);
        assert_eq!(candidate.dates[0].date, "2024-03-05");
        assert_eq!(candidate.dates[1].date_type, "Updated");
        assert_eq!(candidate.alternate_identifiers.len(), 2);
        assert_eq!(candidate.alternate_identifiers[0].alternate_identifier, "42");
        assert_eq!(candidate.creators[0].name, "Ada Lovelace");
        assert_eq!(
            candidate.creators[0].name_identifiers[0].name_identifier_scheme,
            "ORCID"
        );
        assert_eq!(candidate.subjects[0].subject, "archives");
        assert_eq!(candidate.language, "de");
        assert_eq!(candidate.version, "1");
        assert_eq!(candidate.formats, vec!["text/html".to_string()]);
        assert!(candidate.url.is_none());
    }

    #[test]
    fn draft_item_uses_current_year_and_no_dates() {
        let candidate = assembler(vec![item(1)], InMemoryStore::new())
            .assemble(ContentItemId(1), None)
            .unwrap();
        assert_eq!(candidate.publication_year, 2025);
        assert!(candidate.dates.is_empty());
        assert!(candidate.descriptions.is_empty());
        assert!(candidate.creators.is_empty());
        assert_eq!(candidate.language, "en");
    }

    #[test]
    fn url_only_with_doi() {
        let doi = Doi::new("10.1234/ab12").unwrap();
        let candidate = assembler(vec![item(1)], InMemoryStore::new())
            .assemble(ContentItemId(1), Some(&doi))
            .unwrap();
        assert_eq!(candidate.url.as_deref(), Some("https://doi.org/10.1234/ab12"));
    }

    #[test]
    fn translations_and_versions_become_related_identifiers() {
        let store = InMemoryStore::new();
        link(&store, 2, "10.1234/fr");
        link(&store, 3, "10.1234/next");
        link(&store, 4, "10.1234/prev");
        store.set_replaced_by(ContentItemId(1), ContentItemId(3)).unwrap();
        store.set_replaced_by(ContentItemId(4), ContentItemId(1)).unwrap();

        let mut original = item(1);
        // Item 5 has no DOI and is skipped.
        original.translations = vec![ContentItemId(2), ContentItemId(5), ContentItemId(1)];
        let candidate = assembler(vec![original], store)
            .assemble(ContentItemId(1), None)
            .unwrap();

        let relations: Vec<(&str, &str)> = candidate
            .related_identifiers
            .iter()
            .map(|r| (r.related_identifier.as_str(), r.relation_type.as_str()))
            .collect();
        assert_eq!(
            relations,
            vec![
                ("10.1234/fr", "HasTranslation"),
                ("10.1234/next", "IsPreviousVersionOf"),
                ("10.1234/prev", "IsNewVersionOf"),
            ]
        );
    }

    #[test]
    fn unknown_item_is_an_error() {
        let result = assembler(vec![], InMemoryStore::new()).assemble(ContentItemId(9), None);
        assert!(matches!(result, Err(AssemblyError::UnknownItem(ContentItemId(9)))));
    }

    #[test]
    fn clean_text_strips_tags_and_decodes_entities() {
        assert_eq!(clean_text("<b>Bold</b>&#39;s &#x27;x&#x27;"), "Bold 's 'x'");
        assert_eq!(clean_text("Fish &chips; AT&T"), "Fish &chips; AT&T");
        assert_eq!(clean_text("  spaced\n\tout  "), "spaced out");
    }
}
