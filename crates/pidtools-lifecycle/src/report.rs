//! DOI report: every associated DOI with its landing-page URL, as CSV.

use pidtools_core::{ContentItemId, Doi};
use serde::Serialize;

use crate::assembler::MetadataAssembler;
use crate::association::AssociationStore;
use crate::error::StoreError;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReportRow {
    pub item: ContentItemId,
    pub doi: Doi,
    /// Empty when the item is no longer in the catalog.
    pub target_url: String,
}

/// One row per association, ordered by item id.
pub fn doi_report(
    associations: &dyn AssociationStore,
    assembler: &dyn MetadataAssembler,
) -> Result<Vec<ReportRow>, StoreError> {
    let rows = associations
        .list()?
        .into_iter()
        .map(|association| {
            let target_url = match assembler.target_url(association.item) {
                Ok(url) => url,
                Err(e) => {
                    tracing::warn!(item = %association.item, doi = %association.doi, error = %e, "no target URL for report row");
                    String::new()
                }
            };
            ReportRow {
                item: association.item,
                doi: association.doi,
                target_url,
            }
        })
        .collect();
    Ok(rows)
}

/// Render rows as `doi,target_url` lines, without a header.
pub fn to_csv(rows: &[ReportRow]) -> String {
    rows.iter()
        .map(|row| format!("{},{}\n", csv_field(row.doi.as_str()), csv_field(&row.target_url)))
        .collect()
}

fn csv_field(value: &str) -> String {
    if value.contains([',', '"', '\n', '\r']) {
        format!("\"{}\"", value.replace('"', "\"\""))
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::association::{InMemoryStore, LocalAssociation};
    use crate::error::AssemblyError;
    use pidtools_core::CandidateMetadata;

    struct Permalinks;

    impl MetadataAssembler for Permalinks {
        fn assemble(
            &self,
            item: ContentItemId,
            _doi: Option<&Doi>,
        ) -> Result<CandidateMetadata, AssemblyError> {
            Err(AssemblyError::UnknownItem(item))
        }

        fn target_url(&self, item: ContentItemId) -> Result<String, AssemblyError> {
            match item.get() {
                1 => Ok("https://blog.example/?p=1".into()),
                2 => Ok("https://blog.example/a,b".into()),
                _ => Err(AssemblyError::UnknownItem(item)),
            }
        }
    }

    fn associate(store: &InMemoryStore, item: u64, doi: &str) {
        store
            .set(LocalAssociation {
                item: ContentItemId(item),
                doi: Doi::new(doi).unwrap(),
                state: None,
            })
            .unwrap();
    }

    #[test]
    fn report_lists_associations_in_item_order() {
        let store = InMemoryStore::new();
        associate(&store, 3, "10.1234/c");
        associate(&store, 1, "10.1234/a");
        associate(&store, 2, "10.1234/b");

        let rows = doi_report(&store, &Permalinks).unwrap();
        assert_eq!(
            to_csv(&rows),
            "10.1234/a,https://blog.example/?p=1\n\
             10.1234/b,\"https://blog.example/a,b\"\n\
             10.1234/c,\n"
        );
    }

    #[test]
    fn empty_store_gives_empty_report() {
        let rows = doi_report(&InMemoryStore::new(), &Permalinks).unwrap();
        assert!(rows.is_empty());
        assert_eq!(to_csv(&rows), "");
    }
}
