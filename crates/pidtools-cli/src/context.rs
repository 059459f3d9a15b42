//! Wiring shared by every subcommand: the catalog, the file-backed store,
//! the assembler and the event registry. The DataCite client is only built
//! by commands that talk to the registration service, so `report` and
//! `version` work without credentials.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context as _, Result};
use parking_lot::Mutex;
use pidtools_client::DataCiteClient;
use pidtools_lifecycle::{
    ContentItemAssembler, EventListener, EventRegistry, InMemoryCatalog, JsonFileStore,
    LifecycleEvent, LifecycleManager, TracingListener, VersionManager,
};

use crate::config::{load_catalog, PidtoolsConfig};

/// Writes every lifecycle event as one JSON line.
///
/// The CLI points it at stderr so stdout carries only the final outcome.
pub struct JsonLinesListener {
    out: Mutex<Box<dyn Write + Send>>,
}

impl JsonLinesListener {
    pub fn new(out: impl Write + Send + 'static) -> Self {
        Self {
            out: Mutex::new(Box::new(out)),
        }
    }

    pub fn stderr() -> Self {
        Self::new(std::io::stderr())
    }
}

impl EventListener for JsonLinesListener {
    fn on_event(&self, event: &LifecycleEvent) {
        match serde_json::to_string(event) {
            Ok(line) => {
                let mut out = self.out.lock();
                if let Err(e) = writeln!(out, "{line}").and_then(|()| out.flush()) {
                    tracing::warn!(error = %e, "cannot write event line");
                }
            }
            Err(e) => tracing::warn!(event = event.name(), error = %e, "cannot serialize event"),
        }
    }
}

pub struct AppContext {
    pub config: PidtoolsConfig,
    pub store: Arc<JsonFileStore>,
    pub assembler: Arc<ContentItemAssembler>,
    pub events: EventRegistry,
}

impl AppContext {
    /// Load the catalog and open the association store.
    pub fn open(config: PidtoolsConfig, print_events: bool) -> Result<Self> {
        let items = load_catalog(&config.catalog)?;
        tracing::debug!(items = items.len(), catalog = %config.catalog.display(), "loaded catalog");
        let store = Arc::new(
            JsonFileStore::open(config.associations_path())
                .context("cannot open association store")?,
        );
        let assembler = Arc::new(ContentItemAssembler::new(
            config.assembler.clone(),
            Arc::new(InMemoryCatalog::new(items)),
            store.clone(),
            store.clone(),
        ));

        let events = EventRegistry::new();
        events.subscribe(Arc::new(TracingListener));
        if print_events {
            events.subscribe(Arc::new(JsonLinesListener::stderr()));
        }

        Ok(Self {
            config,
            store,
            assembler,
            events,
        })
    }

    /// Build a lifecycle manager talking to the configured service, with
    /// credentials from the environment taking precedence.
    pub fn manager(&self) -> Result<LifecycleManager> {
        let datacite = self
            .config
            .datacite
            .resolve(|var| std::env::var(var).ok())?;
        let client = DataCiteClient::new(datacite).context("cannot build DataCite client")?;
        Ok(self.manager_with(Arc::new(client)))
    }

    /// Build a lifecycle manager over an explicit repository.
    pub fn manager_with(
        &self,
        repository: Arc<dyn pidtools_client::DoiRepository>,
    ) -> LifecycleManager {
        LifecycleManager::new(
            repository,
            self.assembler.clone(),
            self.store.clone(),
            self.config.lifecycle.clone(),
        )
        .with_events(self.events.clone())
    }

    pub fn versions(&self) -> VersionManager {
        VersionManager::new(self.store.clone(), self.events.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pidtools_core::ContentItemId;
    use pidtools_lifecycle::Operation;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn events_are_written_as_json_lines_to_the_given_writer() {
        let buf = SharedBuf::default();
        let listener = JsonLinesListener::new(buf.clone());
        for operation in [Operation::Create, Operation::Delete] {
            listener.on_event(&LifecycleEvent::BeforeOperation {
                operation,
                doi: None,
                item: ContentItemId(42),
                context: serde_json::json!({}),
            });
        }

        let text = String::from_utf8(buf.0.lock().clone()).unwrap();
        let lines: Vec<serde_json::Value> = text
            .lines()
            .map(|line| serde_json::from_str(line).unwrap())
            .collect();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0]["type"], "before_operation");
        assert_eq!(lines[1]["operation"], "delete");
    }
}
