// src/config.rs
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{
    fs,
    path::{Path, PathBuf},
    time::Duration,
};
use tracing::{debug, info};
use url::Url;

use crate::fetch::{ClientCredentials, Relay, Source};
use crate::parse::DelimiterMode;
use crate::upload::{FileStore, DEFAULT_EXTENSIONS, DEFAULT_PREFIX};
use crate::view::{fields::DOCUMENT, status_order_fields, FieldSpec, Session};

/// Looked up in the working directory when no path is given.
pub const DEFAULT_CONFIG_FILE: &str = "erpview.yaml";

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub source: SourceConfig,
    pub parse: ParseConfig,
    pub view: ViewConfig,
    pub upload: UploadConfig,
    pub relay: RelayConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SourceConfig {
    /// Share link or download URL of the export.
    pub url: Option<String>,
    pub timeout_secs: u64,
    pub retries: u32,
    /// When set, a client-credentials token is fetched and sent as a bearer token.
    pub auth: Option<AuthConfig>,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            url: None,
            timeout_secs: 30,
            retries: 0,
            auth: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthConfig {
    pub token_url: String,
    pub client_id: String,
    pub client_secret: String,
    #[serde(default)]
    pub scope: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParseConfig {
    pub mode: DelimiterMode,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub default_columns: usize,
    /// Logical field searched by `show --search`.
    pub search_field: String,
    pub fields: Vec<FieldSpec>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            default_columns: crate::view::DEFAULT_VISIBLE_COLUMNS,
            search_field: DOCUMENT.to_string(),
            fields: status_order_fields(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct UploadConfig {
    pub root: PathBuf,
    pub prefix: String,
    pub extensions: Vec<String>,
}

impl Default for UploadConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("storage"),
            prefix: DEFAULT_PREFIX.to_string(),
            extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub bind: String,
}

impl Default for RelayConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:3000".to_string(),
        }
    }
}

impl Config {
    /// Read `path`, or `erpview.yaml` if present, then apply environment overrides.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut cfg = match path {
            Some(p) => Self::from_file(p)?,
            None if Path::new(DEFAULT_CONFIG_FILE).is_file() => {
                Self::from_file(Path::new(DEFAULT_CONFIG_FILE))?
            }
            None => {
                debug!("no config file, using defaults");
                Self::default()
            }
        };
        cfg.apply_env(|key| std::env::var(key).ok());
        Ok(cfg)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path)
            .with_context(|| format!("reading config {}", path.display()))?;
        let cfg = serde_yaml::from_str(&text)
            .with_context(|| format!("parsing config {}", path.display()))?;
        info!(config = %path.display(), "loaded config");
        Ok(cfg)
    }

    /// Override settings from `ERPVIEW_*` variables. Blank values are ignored.
    pub fn apply_env(&mut self, var: impl Fn(&str) -> Option<String>) {
        let get = |key: &str| var(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        if let Some(url) = get("ERPVIEW_SOURCE_URL") {
            self.source.url = Some(url);
        }
        if let Some(secs) = get("ERPVIEW_TIMEOUT_SECS").and_then(|v| v.parse().ok()) {
            self.source.timeout_secs = secs;
        }
        if let (Some(token_url), Some(client_id), Some(client_secret)) = (
            get("ERPVIEW_TOKEN_URL"),
            get("ERPVIEW_CLIENT_ID"),
            get("ERPVIEW_CLIENT_SECRET"),
        ) {
            self.source.auth = Some(AuthConfig {
                token_url,
                client_id,
                client_secret,
                scope: get("ERPVIEW_SCOPE"),
            });
        }
        if let Some(root) = get("ERPVIEW_UPLOAD_ROOT") {
            self.upload.root = PathBuf::from(root);
        }
        if let Some(bind) = get("ERPVIEW_BIND") {
            self.relay.bind = bind;
        }
    }

    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.source.timeout_secs)
    }

    /// The configured export source, if a URL is set.
    pub fn source(&self) -> Result<Option<Source>> {
        let Some(raw) = &self.source.url else {
            return Ok(None);
        };
        let url = Url::parse(raw).with_context(|| format!("invalid source URL `{raw}`"))?;
        let source = match &self.source.auth {
            None => Source::PublicLink(url),
            Some(auth) => Source::ClientCredentials {
                download_url: url,
                credentials: ClientCredentials {
                    token_url: Url::parse(&auth.token_url)
                        .with_context(|| format!("invalid token URL `{}`", auth.token_url))?,
                    client_id: auth.client_id.clone(),
                    client_secret: auth.client_secret.clone(),
                    scope: auth.scope.clone(),
                },
            },
        };
        Ok(Some(source))
    }

    pub fn relay(&self) -> Result<Relay> {
        let relay = Relay::new(self.source()?, self.timeout()).context("building HTTP client")?;
        Ok(relay.with_retries(self.source.retries, 500))
    }

    pub fn file_store(&self) -> FileStore {
        FileStore::new(&self.upload.root)
            .with_prefix(self.upload.prefix.clone())
            .with_extensions(self.upload.extensions.clone())
    }

    pub fn session(&self) -> Session {
        Session::new(self.view.fields.clone()).with_default_columns(self.view.default_columns)
    }
}
