//! Filesystem byte store.
//!
//! Payloads live in a sharded layout (`root/objects/ab/cd/abcd...`) and are written through a
//! temporary file followed by an atomic rename, so readers never observe partial payloads.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use tokio::fs;
use tokio::io::AsyncWriteExt;

use super::{ByteStore, ByteStream, validate_key};
use crate::assets::source::ContentHash;
use crate::foundation::error::{ReelError, ReelResult};

static TEMP_SEQ: AtomicU64 = AtomicU64::new(0);

#[derive(Clone)]
pub struct LocalByteStore {
    root: PathBuf,
}

impl LocalByteStore {
    /// Open (creating if needed) a store rooted at `root`.
    pub async fn open(root: impl AsRef<Path>) -> ReelResult<Self> {
        let root = root.as_ref().to_path_buf();
        match fs::metadata(&root).await {
            Ok(meta) if !meta.is_dir() => {
                return Err(ReelError::store_not_ready(format!(
                    "path exists but is not a directory: {}",
                    root.display()
                )));
            }
            Ok(_) => {}
            Err(_) => fs::create_dir_all(&root).await.map_err(|e| {
                ReelError::store_not_ready(format!("create store root '{}': {e}", root.display()))
            })?,
        }
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn object_path(&self, id: &ContentHash) -> PathBuf {
        let key = id.as_str();
        let objects = self.root.join("objects");
        if key.len() >= 4 {
            objects.join(&key[0..2]).join(&key[2..4]).join(key)
        } else {
            objects.join(key)
        }
    }
}

impl fmt::Debug for LocalByteStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LocalByteStore")
            .field("root", &self.root)
            .finish()
    }
}

#[async_trait]
impl ByteStore for LocalByteStore {
    async fn exists(&self, id: &ContentHash) -> ReelResult<bool> {
        validate_key(id)?;
        Ok(fs::try_exists(self.object_path(id)).await.unwrap_or(false))
    }

    async fn write(&self, id: &ContentHash, mut stream: ByteStream) -> ReelResult<u64> {
        validate_key(id)?;
        let path = self.object_path(id);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).await.map_err(|e| {
                ReelError::store_not_ready(format!("create '{}': {e}", parent.display()))
            })?;
        }

        let seq = TEMP_SEQ.fetch_add(1, Ordering::Relaxed);
        let temp_path = path.with_extension(format!("tmp{}-{seq}", std::process::id()));
        let io_err =
            |e: std::io::Error| ReelError::store_not_ready(format!("write '{id}': {e}"));

        let written = async {
            let mut file = fs::File::create(&temp_path).await?;
            let n = tokio::io::copy(&mut stream, &mut file).await?;
            file.flush().await?;
            file.sync_all().await?;
            fs::rename(&temp_path, &path).await?;
            Ok::<u64, std::io::Error>(n)
        }
        .await;

        match written {
            Ok(n) => {
                tracing::debug!(id = %id, bytes = n, "stored payload");
                Ok(n)
            }
            Err(e) => {
                let _ = fs::remove_file(&temp_path).await;
                Err(io_err(e))
            }
        }
    }

    async fn read_stream(&self, id: &ContentHash) -> ReelResult<ByteStream> {
        validate_key(id)?;
        match fs::File::open(self.object_path(id)).await {
            Ok(file) => Ok(Box::pin(file)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Err(
                ReelError::store_not_ready(format!("no bytes stored for '{id}'")),
            ),
            Err(e) => Err(ReelError::store_not_ready(format!("open '{id}': {e}"))),
        }
    }

    fn local_path(&self, id: &ContentHash) -> Option<PathBuf> {
        validate_key(id).ok()?;
        Some(self.object_path(id))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/store/local.rs"]
mod tests;
