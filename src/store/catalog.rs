//! User-facing resource list: imported media with display metadata and thumbnails.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use serde::{Deserialize, Serialize};

use tokio::fs;
use tokio::sync::Mutex;

use super::validate_key;
use crate::assets::source::{ContentHash, MediaKind};
use crate::foundation::error::{ReelError, ReelResult};

/// One imported resource as shown in a media library.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct CatalogEntry {
    pub id: ContentHash,
    pub name: String,
    pub kind: MediaKind,
    pub mime: String,
    pub size_bytes: u64,
    /// PNG-encoded preview. Stored beside the index, not inside it.
    #[serde(skip)]
    pub thumbnail_png: Option<Bytes>,
}

#[async_trait]
pub trait ResourceCatalog: Send + Sync {
    /// Insert or replace the entry for `entry.id`.
    async fn add(&self, entry: CatalogEntry) -> ReelResult<()>;
    async fn get(&self, id: &ContentHash) -> ReelResult<Option<CatalogEntry>>;
    /// Remove `id`; returns `false` when it was not present.
    async fn delete(&self, id: &ContentHash) -> ReelResult<bool>;
    /// All entries ordered by id.
    async fn list_all(&self) -> ReelResult<Vec<CatalogEntry>>;
}

#[derive(Debug, Default)]
pub struct MemoryCatalog {
    entries: RwLock<BTreeMap<ContentHash, CatalogEntry>>,
}

impl MemoryCatalog {
    pub fn new() -> Self {
        Self::default()
    }
}

fn poisoned() -> ReelError {
    ReelError::store_not_ready("catalog lock poisoned")
}

#[async_trait]
impl ResourceCatalog for MemoryCatalog {
    async fn add(&self, entry: CatalogEntry) -> ReelResult<()> {
        self.entries
            .write()
            .map_err(|_| poisoned())?
            .insert(entry.id.clone(), entry);
        Ok(())
    }

    async fn get(&self, id: &ContentHash) -> ReelResult<Option<CatalogEntry>> {
        Ok(self.entries.read().map_err(|_| poisoned())?.get(id).cloned())
    }

    async fn delete(&self, id: &ContentHash) -> ReelResult<bool> {
        Ok(self
            .entries
            .write()
            .map_err(|_| poisoned())?
            .remove(id)
            .is_some())
    }

    async fn list_all(&self) -> ReelResult<Vec<CatalogEntry>> {
        Ok(self
            .entries
            .read()
            .map_err(|_| poisoned())?
            .values()
            .cloned()
            .collect())
    }
}

/// Catalog persisted as `index.json` plus one `<id>.png` thumbnail per entry under a directory.
///
/// The index is rewritten through a temporary file and a rename after every mutation.
#[derive(Debug)]
pub struct JsonCatalog {
    root: PathBuf,
    entries: Mutex<BTreeMap<ContentHash, CatalogEntry>>,
}

const INDEX_FILE: &str = "index.json";

impl JsonCatalog {
    /// Open the catalog in `root`, loading an existing index if there is one.
    pub async fn open(root: impl AsRef<Path>) -> ReelResult<Self> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).await.map_err(|e| {
            ReelError::store_not_ready(format!("create catalog '{}': {e}", root.display()))
        })?;

        let index = root.join(INDEX_FILE);
        let mut entries = BTreeMap::new();
        match fs::read(&index).await {
            Ok(raw) => {
                let list: Vec<CatalogEntry> = serde_json::from_slice(&raw).map_err(|e| {
                    ReelError::serde(format!("parse catalog '{}': {e}", index.display()))
                })?;
                for mut entry in list {
                    entry.thumbnail_png = fs::read(thumbnail_path(&root, &entry.id))
                        .await
                        .ok()
                        .map(Bytes::from);
                    entries.insert(entry.id.clone(), entry);
                }
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => {
                return Err(ReelError::store_not_ready(format!(
                    "read catalog '{}': {e}",
                    index.display()
                )));
            }
        }
        tracing::debug!(root = %root.display(), entries = entries.len(), "catalog opened");
        Ok(Self {
            root,
            entries: Mutex::new(entries),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    async fn persist(&self, entries: &BTreeMap<ContentHash, CatalogEntry>) -> ReelResult<()> {
        let list: Vec<&CatalogEntry> = entries.values().collect();
        let raw = serde_json::to_vec_pretty(&list)
            .map_err(|e| ReelError::serde(format!("serialize catalog: {e}")))?;
        let index = self.root.join(INDEX_FILE);
        let temp = self.root.join(format!("{INDEX_FILE}.tmp{}", std::process::id()));
        let io_err = |e: std::io::Error| {
            ReelError::store_not_ready(format!("write catalog '{}': {e}", index.display()))
        };
        fs::write(&temp, raw).await.map_err(io_err)?;
        fs::rename(&temp, &index).await.map_err(io_err)
    }
}

fn thumbnail_path(root: &Path, id: &ContentHash) -> PathBuf {
    root.join(format!("{id}.png"))
}

#[async_trait]
impl ResourceCatalog for JsonCatalog {
    async fn add(&self, entry: CatalogEntry) -> ReelResult<()> {
        validate_key(&entry.id)?;
        let mut entries = self.entries.lock().await;
        let thumb = thumbnail_path(&self.root, &entry.id);
        match &entry.thumbnail_png {
            Some(png) => fs::write(&thumb, png).await.map_err(|e| {
                ReelError::store_not_ready(format!("write thumbnail '{}': {e}", thumb.display()))
            })?,
            None => {
                let _ = fs::remove_file(&thumb).await;
            }
        }
        entries.insert(entry.id.clone(), entry);
        self.persist(&entries).await
    }

    async fn get(&self, id: &ContentHash) -> ReelResult<Option<CatalogEntry>> {
        Ok(self.entries.lock().await.get(id).cloned())
    }

    async fn delete(&self, id: &ContentHash) -> ReelResult<bool> {
        let mut entries = self.entries.lock().await;
        if entries.remove(id).is_none() {
            return Ok(false);
        }
        let _ = fs::remove_file(thumbnail_path(&self.root, id)).await;
        self.persist(&entries).await?;
        Ok(true)
    }

    async fn list_all(&self) -> ReelResult<Vec<CatalogEntry>> {
        Ok(self.entries.lock().await.values().cloned().collect())
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/catalog.rs"]
mod tests;
