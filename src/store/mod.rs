//! Content-addressed persistent byte store.
//!
//! Decoders never read from caller-supplied streams directly: bytes are persisted here first and
//! re-opened by id, so a later process (or cache eviction) can decode the same media again.

pub mod catalog;
pub mod local;
pub mod memory;

use std::path::PathBuf;
use std::pin::Pin;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::{AsyncRead, AsyncReadExt};

use crate::assets::source::ContentHash;
use crate::foundation::error::{ReelError, ReelResult};

/// Owned async byte stream handed to and from a [`ByteStore`].
pub type ByteStream = Pin<Box<dyn AsyncRead + Send>>;

/// Wrap an in-memory payload as a [`ByteStream`].
pub fn stream_from_bytes(bytes: Bytes) -> ByteStream {
    Box::pin(std::io::Cursor::new(bytes))
}

/// Persistent key -> bytes storage keyed by [`ContentHash`].
#[async_trait]
pub trait ByteStore: Send + Sync + std::fmt::Debug {
    /// `true` when bytes for `id` are stored.
    async fn exists(&self, id: &ContentHash) -> ReelResult<bool>;

    /// Persist the whole `stream` under `id`. Overwrites any previous bytes.
    async fn write(&self, id: &ContentHash, stream: ByteStream) -> ReelResult<u64>;

    /// Open the stored bytes for `id`.
    ///
    /// Fails with `StoreNotReady` when nothing is stored under `id`.
    async fn read_stream(&self, id: &ContentHash) -> ReelResult<ByteStream>;

    /// Filesystem path of the stored bytes, for backends that keep them on disk.
    fn local_path(&self, id: &ContentHash) -> Option<PathBuf>;
}

/// Bytes of one stored payload, re-opened from a [`ByteStore`].
#[derive(Clone, Debug)]
pub struct StoredBlob {
    pub id: ContentHash,
    pub bytes: Bytes,
    /// On-disk location when the store is file-backed.
    pub path: Option<PathBuf>,
}

/// Read the full payload for `id` out of `store`.
pub async fn read_blob(store: &dyn ByteStore, id: &ContentHash) -> ReelResult<StoredBlob> {
    let mut stream = store.read_stream(id).await?;
    let mut buf = Vec::new();
    stream
        .read_to_end(&mut buf)
        .await
        .map_err(|e| ReelError::store_not_ready(format!("read '{id}': {e}")))?;
    Ok(StoredBlob {
        id: id.clone(),
        bytes: Bytes::from(buf),
        path: store.local_path(id),
    })
}

/// Keys double as file names, so only ASCII alphanumerics are accepted.
pub(crate) fn validate_key(id: &ContentHash) -> ReelResult<()> {
    let key = id.as_str();
    if key.is_empty() {
        return Err(ReelError::validation("store key cannot be empty"));
    }
    if !key.bytes().all(|b| b.is_ascii_alphanumeric()) {
        return Err(ReelError::validation(format!(
            "store key '{key}' must be ASCII alphanumeric"
        )));
    }
    Ok(())
}

#[cfg(test)]
#[path = "../../tests/unit/store/mod.rs"]
mod tests;
