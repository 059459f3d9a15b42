//! # Field Differ
//!
//! Reports which top-level metadata fields differ between the record held
//! by the registration service and a freshly assembled candidate.
//!
//! ## Algorithm
//!
//! For every top-level key of the candidate:
//!
//! 1. Absent from the existing record: changed.
//! 2. Both values structured with different element counts: changed,
//!    unless the key is on the enrichment allow-list, in which case the
//!    count check is skipped and comparison falls through to recursion.
//! 3. Both values structured: changed if any candidate child differs,
//!    recursively. Nested levels always apply the count check.
//! 4. Both scalars: changed unless [`Scalar::loosely_eq`].
//!
//! Only candidate keys are visited, so fields the service adds on its own
//! (`state`, `created`, `doi`, ...) never count as changes. The allow-list
//! exists because the service enriches some objects with derived
//! sub-fields (`types` gains vocabulary mappings), which would otherwise
//! flag the field on every comparison.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use crate::value::{Attributes, MetadataValue, Scalar};

/// Configuration for [`changed_fields`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiffPolicy {
    /// Top-level keys for which an element-count mismatch alone does not
    /// mark the field changed.
    #[serde(default = "DiffPolicy::default_enriched_keys")]
    pub enriched_keys: BTreeSet<String>,
}

impl DiffPolicy {
    /// A policy with an empty allow-list: every count mismatch is a change.
    pub fn strict() -> Self {
        Self {
            enriched_keys: BTreeSet::new(),
        }
    }

    /// Add a key to the enrichment allow-list.
    pub fn with_enriched_key(mut self, key: impl Into<String>) -> Self {
        self.enriched_keys.insert(key.into());
        self
    }

    /// Whether `key` is on the enrichment allow-list.
    pub fn is_enriched(&self, key: &str) -> bool {
        self.enriched_keys.contains(key)
    }

    fn default_enriched_keys() -> BTreeSet<String> {
        BTreeSet::from(["types".to_string()])
    }
}

impl Default for DiffPolicy {
    fn default() -> Self {
        Self {
            enriched_keys: Self::default_enriched_keys(),
        }
    }
}

/// Compute the set of top-level candidate keys whose values differ from
/// `existing`.
///
/// `changed_fields(x, x)` is empty for any mapping, and comparing against
/// an empty `existing` reports every candidate key.
pub fn changed_fields(
    existing: &Attributes,
    candidate: &Attributes,
    policy: &DiffPolicy,
) -> BTreeSet<String> {
    candidate
        .iter()
        .filter(|(key, value)| match existing.get(key.as_str()) {
            None => true,
            Some(current) => differs(current, value, policy.is_enriched(key)),
        })
        .map(|(key, _)| key.clone())
        .collect()
}

fn differs(existing: &MetadataValue, candidate: &MetadataValue, skip_count_check: bool) -> bool {
    match (existing, candidate) {
        (MetadataValue::Scalar(a), MetadataValue::Scalar(b)) => !a.loosely_eq(b),

        // The service reports some empty fields as null.
        (MetadataValue::Scalar(Scalar::Null), c) if c.structured_len() == Some(0) => false,

        (MetadataValue::List(e), MetadataValue::List(c)) => {
            if !skip_count_check && e.len() != c.len() {
                return true;
            }
            c.iter().enumerate().any(|(i, child)| match e.get(i) {
                None => true,
                Some(current) => differs(current, child, false),
            })
        }

        (MetadataValue::Map(e), MetadataValue::Map(c)) => {
            if !skip_count_check && e.len() != c.len() {
                return true;
            }
            map_children_differ(e, c)
        }

        _ => true,
    }
}

fn map_children_differ(
    existing: &BTreeMap<String, MetadataValue>,
    candidate: &BTreeMap<String, MetadataValue>,
) -> bool {
    candidate.iter().any(|(key, child)| match existing.get(key) {
        None => true,
        Some(current) => differs(current, child, false),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use serde_json::{json, Value};

    fn attrs(value: Value) -> Attributes {
        MetadataValue::attributes_from_json(value)
    }

    fn keys(names: &[&str]) -> BTreeSet<String> {
        names.iter().map(|s| s.to_string()).collect()
    }

    fn sample() -> Value {
        json!({
            "doi": "10.1234/5678",
            "titles": [{"title": "Existing Title", "lang": "en"}],
            "alternateIdentifiers": [
                {"alternateIdentifier": "Existing Identifier", "alternateIdentifierType": "URL"}
            ],
            "publicationYear": 2024,
            "types": {"resourceTypeGeneral": "Text", "ris": "BLOG"}
        })
    }

    #[test]
    fn identical_records_have_no_changes() {
        let x = attrs(sample());
        assert!(changed_fields(&x, &x, &DiffPolicy::default()).is_empty());
    }

    #[test]
    fn empty_existing_marks_every_key() {
        let x = attrs(sample());
        let changed = changed_fields(&Attributes::new(), &x, &DiffPolicy::default());
        assert_eq!(changed, x.keys().cloned().collect());
    }

    #[test]
    fn nested_leaf_change_marks_only_its_top_level_key() {
        let existing = attrs(sample());
        let mut new = sample();
        new["alternateIdentifiers"][0]["alternateIdentifier"] = json!("New Identifier");
        let changed = changed_fields(&existing, &attrs(new.clone()), &DiffPolicy::default());
        assert_eq!(changed, keys(&["alternateIdentifiers"]));

        new["alternateIdentifiers"][0]["alternateIdentifier"] = json!("Existing Identifier");
        assert!(changed_fields(&existing, &attrs(new), &DiffPolicy::default()).is_empty());
    }

    #[test]
    fn numeric_strings_from_the_service_match_native_numbers() {
        let existing = attrs(json!({"publicationYear": "2024"}));
        let same = attrs(json!({"publicationYear": 2024}));
        let later = attrs(json!({"publicationYear": 2025}));
        assert!(changed_fields(&existing, &same, &DiffPolicy::default()).is_empty());
        assert_eq!(
            changed_fields(&existing, &later, &DiffPolicy::default()),
            keys(&["publicationYear"])
        );
    }

    #[test]
    fn service_only_keys_are_ignored() {
        let existing = attrs(json!({"language": "en", "state": "draft", "created": "2024-01-01"}));
        let candidate = attrs(json!({"language": "en"}));
        assert!(changed_fields(&existing, &candidate, &DiffPolicy::default()).is_empty());
    }

    #[test]
    fn enriched_key_tolerates_extra_sub_fields() {
        let existing = attrs(json!({
            "types": {"ris": "BLOG", "resourceTypeGeneral": "Text", "schemaOrg": "BlogPosting"}
        }));
        let candidate = attrs(json!({"types": {"ris": "BLOG", "resourceTypeGeneral": "Text"}}));
        assert!(changed_fields(&existing, &candidate, &DiffPolicy::default()).is_empty());
        assert_eq!(
            changed_fields(&existing, &candidate, &DiffPolicy::strict()),
            keys(&["types"])
        );
    }

    #[test]
    fn enriched_key_still_detects_value_changes() {
        let existing = attrs(json!({"types": {"ris": "BLOG", "citeproc": "webpage"}}));
        let candidate = attrs(json!({"types": {"ris": "GEN"}}));
        assert_eq!(
            changed_fields(&existing, &candidate, &DiffPolicy::default()),
            keys(&["types"])
        );
    }

    #[test]
    fn count_mismatch_on_other_keys_is_a_change() {
        let existing = attrs(json!({"titles": [{"title": "A"}, {"title": "B"}]}));
        let candidate = attrs(json!({"titles": [{"title": "A"}]}));
        assert_eq!(
            changed_fields(&existing, &candidate, &DiffPolicy::default()),
            keys(&["titles"])
        );
    }

    #[test]
    fn allow_list_applies_only_at_top_level() {
        let policy = DiffPolicy::strict().with_enriched_key("creators");
        let existing = attrs(json!({"creators": [{"name": "A", "nameType": "Personal"}]}));
        let candidate = attrs(json!({"creators": [{"name": "A"}]}));
        assert_eq!(
            changed_fields(&existing, &candidate, &policy),
            keys(&["creators"])
        );
    }

    #[test]
    fn configured_allow_list_extends_tolerance() {
        let policy = DiffPolicy::default().with_enriched_key("creators");
        let existing = attrs(json!({"creators": [{"name": "A"}, {"name": "B"}]}));
        let candidate = attrs(json!({"creators": [{"name": "A"}]}));
        assert!(changed_fields(&existing, &candidate, &policy).is_empty());
    }

    #[test]
    fn null_matches_empty_candidate_list() {
        let existing = attrs(json!({"relatedItems": null, "subjects": null}));
        let candidate = attrs(json!({"relatedItems": [], "subjects": [{"subject": "history"}]}));
        assert_eq!(
            changed_fields(&existing, &candidate, &DiffPolicy::default()),
            keys(&["subjects"])
        );
    }

    #[test]
    fn shape_mismatch_is_a_change() {
        let existing = attrs(json!({"publisher": {"name": "EHRI"}, "formats": "text/html"}));
        let candidate = attrs(json!({"publisher": "EHRI", "formats": ["text/html"]}));
        assert_eq!(
            changed_fields(&existing, &candidate, &DiffPolicy::default()),
            keys(&["publisher", "formats"])
        );
    }

    #[test]
    fn policy_deserializes_with_default_allow_list() {
        let policy: DiffPolicy = serde_json::from_value(json!({})).unwrap();
        assert!(policy.is_enriched("types"));
    }

    fn arb_leaf() -> impl Strategy<Value = Value> {
        prop_oneof![
            any::<bool>().prop_map(Value::from),
            any::<i32>().prop_map(Value::from),
            "[a-z]{0,8}".prop_map(Value::from),
        ]
    }

    fn arb_value() -> impl Strategy<Value = Value> {
        arb_leaf().prop_recursive(3, 24, 4, |inner| {
            prop_oneof![
                prop::collection::vec(inner.clone(), 0..4).prop_map(Value::from),
                prop::collection::btree_map("[a-z]{1,6}", inner, 0..4)
                    .prop_map(|m| Value::Object(m.into_iter().collect())),
            ]
        })
    }

    fn arb_attributes() -> impl Strategy<Value = Attributes> {
        prop::collection::btree_map("[a-zA-Z]{1,10}", arb_value(), 1..6)
            .prop_map(|m| m.into_iter().map(|(k, v)| (k, MetadataValue::from(v))).collect())
    }

    proptest! {
        #[test]
        fn reflexive_for_any_record(x in arb_attributes()) {
            prop_assert!(changed_fields(&x, &x, &DiffPolicy::default()).is_empty());
            prop_assert!(changed_fields(&x, &x, &DiffPolicy::strict()).is_empty());
        }

        #[test]
        fn empty_existing_reports_all_keys(x in arb_attributes()) {
            let changed = changed_fields(&Attributes::new(), &x, &DiffPolicy::default());
            prop_assert_eq!(changed, x.keys().cloned().collect::<BTreeSet<_>>());
        }

        #[test]
        fn single_leaf_edit_isolated_to_its_key(
            x in arb_attributes(),
            title in "[a-z]{1,8}",
        ) {
            let mut existing = x.clone();
            existing.insert(
                "titles".into(),
                MetadataValue::from(json!([{"title": title.clone()}, {"title": "b"}])),
            );
            let mut candidate = existing.clone();
            candidate.insert(
                "titles".into(),
                MetadataValue::from(json!([{"title": format!("{title}!")}, {"title": "b"}])),
            );
            let changed = changed_fields(&existing, &candidate, &DiffPolicy::default());
            prop_assert_eq!(changed, keys(&["titles"]));
        }
    }
}
