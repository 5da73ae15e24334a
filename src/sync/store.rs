//! Dump files on disk, one per producing side.

use miette::Diagnostic;
use serde_json::Value;
use sha2::{Digest, Sha256};
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;
use thiserror::Error;
use tracing::debug;

use super::selection::Origin;
use crate::db::DumpPayload;

#[derive(Error, Diagnostic, Debug)]
pub enum StoreError {
    #[error("{origin} dump file not found")]
    #[diagnostic(
        code(tams::sync::store::not_found),
        help("Run `tams-sync dump --from {origin}` on the producing side and copy the file over")
    )]
    NotFound { origin: Origin, path: PathBuf },

    #[error("Invalid dump JSON: {0}")]
    #[diagnostic(code(tams::sync::store::parse))]
    Parse(#[from] serde_json::Error),

    #[error("I/O error on {path}: {source}")]
    #[diagnostic(code(tams::sync::store::io))]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Directory holding `server_dump.json` and `node_dump.json`.
#[derive(Debug, Clone)]
pub struct DumpStore {
    dir: PathBuf,
}

impl DumpStore {
    /// Open the store, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, StoreError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| StoreError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path(&self, origin: Origin) -> PathBuf {
        self.dir.join(origin.dump_file_name())
    }

    pub fn exists(&self, origin: Origin) -> bool {
        self.path(origin).is_file()
    }

    /// Parse `text` and write it as the dump for `origin`, replacing any
    /// previous dump. Invalid JSON leaves the existing file untouched.
    pub fn save(&self, text: &str, origin: Origin) -> Result<PathBuf, StoreError> {
        let document: Value = serde_json::from_str(text)?;
        let rendered = serde_json::to_string_pretty(&document)?;

        let path = self.path(origin);
        let io_err = |source| StoreError::Io {
            path: path.clone(),
            source,
        };

        let mut tmp = NamedTempFile::new_in(&self.dir).map_err(io_err)?;
        tmp.write_all(rendered.as_bytes()).map_err(io_err)?;
        tmp.write_all(b"\n").map_err(io_err)?;
        tmp.persist(&path).map_err(|e| io_err(e.error))?;

        debug!(path = %path.display(), bytes = rendered.len(), "saved dump");
        Ok(path)
    }

    /// Read the dump for `origin` as a general JSON document.
    pub fn load(&self, origin: Origin) -> Result<Value, StoreError> {
        let text = self.read(origin)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Read the dump for `origin` as dump records.
    pub fn load_payload(&self, origin: Origin) -> Result<DumpPayload, StoreError> {
        let text = self.read(origin)?;
        Ok(serde_json::from_str(&text)?)
    }

    /// SHA-256 of the dump file, lowercase hex.
    pub fn checksum(&self, origin: Origin) -> Result<String, StoreError> {
        let bytes = self.read_bytes(origin)?;
        let digest = Sha256::digest(&bytes);
        Ok(digest.iter().map(|b| format!("{:02x}", b)).collect())
    }

    fn read(&self, origin: Origin) -> Result<String, StoreError> {
        let bytes = self.read_bytes(origin)?;
        String::from_utf8(bytes).map_err(|e| StoreError::Io {
            path: self.path(origin),
            source: std::io::Error::new(std::io::ErrorKind::InvalidData, e),
        })
    }

    fn read_bytes(&self, origin: Origin) -> Result<Vec<u8>, StoreError> {
        let path = self.path(origin);
        match std::fs::read(&path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(StoreError::NotFound { origin, path })
            }
            Err(source) => Err(StoreError::Io { path, source }),
        }
    }
}
