//! # JSON Document Store
//!
//! Single JSON file on disk holding every consultation ever submitted.
//!
//! ## Layout
//!
//! ```json
//! { "consultations": [ { "id": "...", "timestamp": "...", "name": "..." } ] }
//! ```
//!
//! - Missing file, missing or `null` `consultations` key reads as an empty list
//! - Records are kept as opaque JSON, whatever an older writer stored reads back as is
//! - Unknown top-level keys survive every write
//! - Order of the list is submission order, records are never rewritten
//!
//! ## Writes
//!
//! - Every operation is whole-document: read, modify, write back
//! - The new document lands in a sibling `.tmp` file which is renamed over the old one,
//!   so a failed write leaves the previous contents intact
//! - Appends inside one process are serialized by a mutex
//! - Nothing guards against a second process writing the same file
use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use thiserror::Error;
use tokio::{fs, sync::Mutex};
use tracing::{debug, error, info, warn};

use crate::models::Consultation;

#[derive(Debug, Error)]
pub enum StorageError {
    #[error("I/O error on {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed document {path}: {source}")]
    Malformed {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Failed to encode document: {0}")]
    Encode(#[source] serde_json::Error),
}

#[async_trait]
pub trait RecordStore: Send + Sync + 'static {
    async fn append(&self, consultation: &Consultation) -> Result<(), StorageError>;

    async fn list_all(&self) -> Result<Vec<Value>, StorageError>;
}

#[derive(Serialize, Deserialize, Default, Debug)]
struct Document {
    #[serde(default)]
    consultations: Option<Vec<Value>>,

    #[serde(flatten)]
    rest: Map<String, Value>,
}

pub struct JsonFileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonFileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Makes sure the document exists with a `consultations` list.
    pub async fn init(&self) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read().await?;
        document.consultations.get_or_insert_with(Vec::new);
        self.write(&document).await
    }

    async fn read(&self) -> Result<Document, StorageError> {
        let bytes = match fs::read(&self.path).await {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!("{} does not exist yet, starting empty", self.path.display());
                return Ok(Document::default());
            }
            Err(source) => {
                return Err(StorageError::Io {
                    path: self.path.clone(),
                    source,
                });
            }
        };

        if bytes.iter().all(u8::is_ascii_whitespace) {
            return Ok(Document::default());
        }

        serde_json::from_slice(&bytes).map_err(|source| StorageError::Malformed {
            path: self.path.clone(),
            source,
        })
    }

    async fn write(&self, document: &Document) -> Result<(), StorageError> {
        let bytes = serde_json::to_vec_pretty(document).map_err(StorageError::Encode)?;
        let temp = self.temp_path();

        let io_error = |source: std::io::Error| StorageError::Io {
            path: temp.clone(),
            source,
        };

        fs::write(&temp, &bytes).await.map_err(io_error)?;

        if let Err(source) = fs::rename(&temp, &self.path).await {
            if let Err(e) = fs::remove_file(&temp).await {
                warn!("Failed to remove {}: {e}", temp.display());
            }
            return Err(StorageError::Io {
                path: self.path.clone(),
                source,
            });
        }

        Ok(())
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");

        self.path.with_file_name(name)
    }
}

#[async_trait]
impl RecordStore for JsonFileStore {
    async fn append(&self, consultation: &Consultation) -> Result<(), StorageError> {
        let _guard = self.write_lock.lock().await;

        let mut document = self.read().await?;
        let consultations = document.consultations.get_or_insert_with(Vec::new);
        consultations.push(consultation.clone().into());
        let count = consultations.len();
        self.write(&document).await?;

        debug!("{} now holds {count} consultations", self.path.display());

        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<Value>, StorageError> {
        Ok(self.read().await?.consultations.unwrap_or_default())
    }
}

pub async fn init_store(db_path: &Path) -> Arc<JsonFileStore> {
    let store = Arc::new(JsonFileStore::new(db_path));

    match store.init().await {
        Ok(()) => info!("Database initialized at {}", store.path().display()),
        Err(e) => error!("Database initialization failed: {e}"),
    }

    store
}
