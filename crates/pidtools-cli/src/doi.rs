//! # DOI Subcommands
//!
//! - `inspect`: candidate metadata, remote record and changed fields.
//! - `create` / `update` / `save`: register or resend metadata.
//! - `register` / `publish` / `hide`: submit a state event.
//! - `delete`: remove a draft DOI.
//!
//! Every command prints its outcome as pretty JSON on stdout and exits
//! with status 1 when the operation failed.

use anyhow::Result;
use clap::Args;
use pidtools_core::{ContentItemId, StateEvent};
use pidtools_lifecycle::{LifecycleManager, OperationFailure, OperationOutcome};
use serde::Serialize;

/// Selects the content item a command acts on.
#[derive(Args, Debug, Clone, Copy)]
pub struct ItemArgs {
    /// Content item id.
    #[arg(long)]
    pub item: u64,
}

impl ItemArgs {
    pub fn id(&self) -> ContentItemId {
        ContentItemId(self.item)
    }
}

/// A lifecycle action on one content item.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Inspect,
    Create,
    Update,
    Save,
    Transition(StateEvent),
    Delete,
}

/// Run `action` and print the outcome. Returns the process exit code.
pub async fn run_doi(action: Action, args: &ItemArgs, manager: &LifecycleManager) -> Result<u8> {
    let item = args.id();
    let outcome = match action {
        Action::Inspect => {
            return match manager.open_for_inspection(item).await {
                Ok(inspection) => {
                    let mut value = serde_json::to_value(&inspection)?;
                    if let Some(deleted_on) =
                        inspection.tombstone.as_ref().and_then(|t| t.deleted_on())
                    {
                        value["deleted_on"] = serde_json::Value::from(deleted_on);
                    }
                    print_json(&value)?;
                    Ok(0)
                }
                Err(failure) => report_failure(&failure),
            };
        }
        Action::Create => manager.create_doi(item).await,
        Action::Save => manager.save_metadata(item).await,
        Action::Update => match manager.association(item) {
            Ok(association) => manager.update_doi(item, &association.doi).await,
            Err(failure) => Err(failure),
        },
        Action::Transition(event) => match manager.association(item) {
            Ok(association) => manager.change_state(item, &association.doi, event).await,
            Err(failure) => Err(failure),
        },
        Action::Delete => match manager.association(item) {
            Ok(association) => manager.delete_doi(item, &association.doi).await,
            Err(failure) => Err(failure),
        },
    };
    report_outcome(outcome)
}

fn report_outcome(outcome: OperationOutcome) -> Result<u8> {
    match outcome {
        Ok(success) => {
            print_json(&success)?;
            Ok(0)
        }
        Err(failure) => report_failure(&failure),
    }
}

fn report_failure(failure: &OperationFailure) -> Result<u8> {
    print_json(failure)?;
    Ok(1)
}

pub(crate) fn print_json<T: Serialize + ?Sized>(value: &T) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::PidtoolsConfig;
    use crate::context::AppContext;
    use pidtools_client::{DataCiteClient, DataCiteConfig};
    use pidtools_core::DoiState;
    use pidtools_lifecycle::AssociationStore;
    use serde_json::json;
    use std::sync::Arc;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn context(dir: &std::path::Path) -> AppContext {
        std::fs::write(
            dir.join("catalog.yaml"),
            "- id: 42\n  title: Report 2024\n  permalink: https://blog.example/?p=42\n",
        )
        .unwrap();
        std::fs::write(
            dir.join("pidtools.yaml"),
            "lifecycle:\n  prefix: \"10.1234\"\nassembler:\n  publisher: EHRI\ncatalog: catalog.yaml\n",
        )
        .unwrap();
        let config = PidtoolsConfig::load(&dir.join("pidtools.yaml")).unwrap();
        AppContext::open(config, false).unwrap()
    }

    fn manager(ctx: &AppContext, mock_server: &MockServer) -> LifecycleManager {
        let config = DataCiteConfig::new(
            format!("{}/dois", mock_server.uri()).parse().unwrap(),
            "EHRI.BLOG",
            "s3cret",
        );
        ctx.manager_with(Arc::new(DataCiteClient::new(config).unwrap()))
    }

    #[tokio::test]
    async fn create_persists_association_to_state_dir() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let mock_server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/dois"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "data": {"id": "10.1234/ab12", "type": "dois", "attributes": {"state": "draft"}}
            })))
            .expect(1)
            .mount(&mock_server)
            .await;

        let code = run_doi(Action::Create, &ItemArgs { item: 42 }, &manager(&ctx, &mock_server))
            .await
            .unwrap();
        assert_eq!(code, 0);

        let reopened =
            pidtools_lifecycle::JsonFileStore::open(ctx.config.associations_path()).unwrap();
        let association = reopened.get(ContentItemId(42)).unwrap().unwrap();
        assert_eq!(association.doi.as_str(), "10.1234/ab12");
        assert_eq!(association.state, Some(DoiState::Draft));
    }

    #[tokio::test]
    async fn transition_without_doi_exits_with_failure() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let mock_server = MockServer::start().await;

        let code = run_doi(
            Action::Transition(StateEvent::Publish),
            &ItemArgs { item: 42 },
            &manager(&ctx, &mock_server),
        )
        .await
        .unwrap();
        assert_eq!(code, 1);
        assert!(mock_server.received_requests().await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn inspect_without_doi_succeeds_offline() {
        let dir = tempfile::tempdir().unwrap();
        let ctx = context(dir.path());
        let mock_server = MockServer::start().await;

        let code = run_doi(Action::Inspect, &ItemArgs { item: 42 }, &manager(&ctx, &mock_server))
            .await
            .unwrap();
        assert_eq!(code, 0);
    }
}
