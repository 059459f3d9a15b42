//! # Configuration File
//!
//! `pidtools.yaml` aggregates everything a command needs:
//!
//! ```yaml
//! datacite:
//!   service_url: https://api.test.datacite.org/dois
//!   client_id: EHRI.BLOG
//!   timeout_secs: 30
//! lifecycle:
//!   prefix: "10.1234"
//! assembler:
//!   publisher: EHRI
//! state_dir: .pidtools
//! catalog: catalog.yaml
//! ```
//!
//! Credentials are normally left out of the file: `DATACITE_CLIENT_ID`,
//! `DATACITE_CLIENT_SECRET`, `DATACITE_SERVICE_URL` and
//! `DATACITE_TIMEOUT_SECS` override the `datacite` section.
//!
//! Relative `state_dir` and `catalog` paths resolve against the directory
//! holding the configuration file.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use pidtools_client::{DataCiteConfig, DEFAULT_SERVICE_URL};
use pidtools_lifecycle::{AssemblerConfig, ContentItem, LifecycleConfig};
use serde::Deserialize;
use url::Url;

/// File name of the association store inside `state_dir`.
pub const ASSOCIATIONS_FILE: &str = "associations.json";

/// Parsed `pidtools.yaml`.
#[derive(Debug, Clone, Deserialize)]
pub struct PidtoolsConfig {
    #[serde(default)]
    pub datacite: DataCiteSection,
    pub lifecycle: LifecycleConfig,
    pub assembler: AssemblerConfig,
    #[serde(default = "PidtoolsConfig::default_state_dir")]
    pub state_dir: PathBuf,
    pub catalog: PathBuf,
}

/// The `datacite` section. Every field may come from the environment instead.
#[derive(Clone, Default, Deserialize)]
pub struct DataCiteSection {
    #[serde(default)]
    pub service_url: Option<String>,
    #[serde(default)]
    pub client_id: Option<String>,
    #[serde(default)]
    pub client_secret: Option<String>,
    #[serde(default)]
    pub timeout_secs: Option<u64>,
}

impl std::fmt::Debug for DataCiteSection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DataCiteSection")
            .field("service_url", &self.service_url)
            .field("client_id", &self.client_id)
            .field(
                "client_secret",
                &self.client_secret.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DataCiteSection {
    /// Resolve the client configuration, letting `env` override the file.
    pub fn resolve(&self, env: impl Fn(&str) -> Option<String>) -> Result<DataCiteConfig> {
        let pick = |var: &str, file: &Option<String>| env(var).or_else(|| file.clone());

        let raw_url = pick("DATACITE_SERVICE_URL", &self.service_url)
            .unwrap_or_else(|| DEFAULT_SERVICE_URL.to_string());
        let service_url: Url = raw_url
            .parse()
            .with_context(|| format!("invalid DataCite service URL: {raw_url}"))?;
        let Some(client_id) = pick("DATACITE_CLIENT_ID", &self.client_id) else {
            bail!("DataCite client id missing: set DATACITE_CLIENT_ID or datacite.client_id");
        };
        let Some(client_secret) = pick("DATACITE_CLIENT_SECRET", &self.client_secret) else {
            bail!(
                "DataCite client secret missing: set DATACITE_CLIENT_SECRET or datacite.client_secret"
            );
        };
        let timeout_secs = match env("DATACITE_TIMEOUT_SECS") {
            Some(raw) => Some(
                raw.parse()
                    .with_context(|| format!("invalid DATACITE_TIMEOUT_SECS: {raw}"))?,
            ),
            None => self.timeout_secs,
        };

        let config = DataCiteConfig::new(service_url, client_id, client_secret);
        Ok(match timeout_secs {
            Some(secs) => config.with_timeout_secs(secs),
            None => config,
        })
    }
}

impl PidtoolsConfig {
    fn default_state_dir() -> PathBuf {
        PathBuf::from(".pidtools")
    }

    /// Read and parse the file at `path`, resolving relative paths against
    /// its directory.
    pub fn load(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .with_context(|| format!("cannot read config file {}", path.display()))?;
        let mut config: Self = serde_yaml::from_str(&raw)
            .with_context(|| format!("invalid config file {}", path.display()))?;
        let base = path.parent().unwrap_or_else(|| Path::new(""));
        config.state_dir = resolve_path(&config.state_dir, base);
        config.catalog = resolve_path(&config.catalog, base);
        tracing::debug!(config = %path.display(), state_dir = %config.state_dir.display(), "loaded configuration");
        Ok(config)
    }

    pub fn associations_path(&self) -> PathBuf {
        self.state_dir.join(ASSOCIATIONS_FILE)
    }
}

/// Absolute paths are kept; relative ones are joined onto `base`.
pub fn resolve_path(path: &Path, base: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        base.join(path)
    }
}

/// Load the content catalog: a JSON (`.json`) or YAML list of items.
pub fn load_catalog(path: &Path) -> Result<Vec<ContentItem>> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("cannot read catalog {}", path.display()))?;
    let items = if path.extension().is_some_and(|ext| ext == "json") {
        serde_json::from_str(&raw).with_context(|| format!("invalid catalog {}", path.display()))?
    } else {
        serde_yaml::from_str(&raw).with_context(|| format!("invalid catalog {}", path.display()))?
    };
    Ok(items)
}
