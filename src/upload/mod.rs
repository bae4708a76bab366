// src/upload/mod.rs
//! Store uploaded exports under `<root>/<prefix>/<file name>`, overwriting
//! anything already stored under the same name.

use std::path::{Path, PathBuf};

use chrono::{DateTime, Utc};
use serde::Serialize;
use thiserror::Error;
use tokio::fs;
use tracing::{debug, info, instrument};

pub const DEFAULT_PREFIX: &str = "inventarios";
pub const DEFAULT_EXTENSIONS: [&str; 3] = ["txt", "pdf", "csv"];

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("`{0}` is not a plain file name")]
    InvalidName(String),
    #[error("extension of `{name}` is not one of {allowed:?}")]
    Extension { name: String, allowed: Vec<String> },
    #[error("I/O error on {path}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct StoredObject {
    /// `<prefix>/<file name>`
    pub key: String,
    pub size_bytes: u64,
    pub stored_at: DateTime<Utc>,
}

/// A directory-backed object store keyed by file name.
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
    prefix: String,
    allowed_extensions: Vec<String>,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            prefix: DEFAULT_PREFIX.to_string(),
            allowed_extensions: DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect(),
        }
    }

    pub fn with_prefix(mut self, prefix: impl Into<String>) -> Self {
        let prefix: String = prefix.into();
        self.prefix = prefix.trim_matches('/').to_string();
        self
    }

    /// Restrict accepted extensions (case-insensitive). Empty accepts anything.
    pub fn with_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_extensions = extensions
            .into_iter()
            .map(|e| {
                let e: String = e.into();
                e.trim_start_matches('.').to_ascii_lowercase()
            })
            .collect();
        self
    }

    fn key(&self, name: &str) -> String {
        if self.prefix.is_empty() {
            name.to_string()
        } else {
            format!("{}/{}", self.prefix, name)
        }
    }

    pub fn path_for(&self, name: &str) -> Result<PathBuf, UploadError> {
        let name = self.check_name(name)?;
        Ok(self.root.join(self.key(name)))
    }

    fn check_name<'a>(&self, name: &'a str) -> Result<&'a str, UploadError> {
        let is_plain = !name.is_empty()
            && name != "."
            && name != ".."
            && !name.contains(['/', '\\'])
            && Path::new(name).file_name().and_then(|n| n.to_str()) == Some(name);
        if !is_plain {
            return Err(UploadError::InvalidName(name.to_string()));
        }
        if !self.allowed_extensions.is_empty() {
            let ext = Path::new(name)
                .extension()
                .and_then(|e| e.to_str())
                .map(str::to_ascii_lowercase)
                .unwrap_or_default();
            if !self.allowed_extensions.contains(&ext) {
                return Err(UploadError::Extension {
                    name: name.to_string(),
                    allowed: self.allowed_extensions.clone(),
                });
            }
        }
        Ok(name)
    }

    /// Store `bytes` under `name`, replacing any previous object.
    #[instrument(level = "info", skip(self, bytes), fields(len = bytes.len()))]
    pub async fn put(&self, name: &str, bytes: &[u8]) -> Result<StoredObject, UploadError> {
        let path = self.path_for(name)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|source| UploadError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        // Write beside the target and rename so readers never see a partial file.
        let tmp = path.with_file_name(format!("{name}.part"));
        fs::write(&tmp, bytes).await.map_err(|source| UploadError::Io {
            path: tmp.clone(),
            source,
        })?;
        fs::rename(&tmp, &path).await.map_err(|source| UploadError::Io {
            path: path.clone(),
            source,
        })?;

        let stored = StoredObject {
            key: self.key(name),
            size_bytes: bytes.len() as u64,
            stored_at: Utc::now(),
        };
        info!(key = %stored.key, bytes = stored.size_bytes, "stored upload");
        Ok(stored)
    }

    /// Read a local file and store it under its own file name.
    pub async fn upload_file(&self, local: &Path) -> Result<StoredObject, UploadError> {
        let name = local
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| UploadError::InvalidName(local.display().to_string()))?;
        let bytes = fs::read(local).await.map_err(|source| UploadError::Io {
            path: local.to_path_buf(),
            source,
        })?;
        debug!(file = %local.display(), "read local file");
        self.put(name, &bytes).await
    }

    pub async fn get(&self, name: &str) -> Result<Vec<u8>, UploadError> {
        let path = self.path_for(name)?;
        fs::read(&path).await.map_err(|source| UploadError::Io {
            path: path.clone(),
            source,
        })
    }
}
