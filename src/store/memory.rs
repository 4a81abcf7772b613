use std::collections::HashMap;
use std::path::PathBuf;
use std::sync::RwLock;

use async_trait::async_trait;
use bytes::Bytes;
use tokio::io::AsyncReadExt;

use super::{ByteStore, ByteStream, stream_from_bytes, validate_key};
use crate::assets::source::ContentHash;
use crate::foundation::error::{ReelError, ReelResult};

/// Process-local byte store. Used by tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryByteStore {
    blobs: RwLock<HashMap<ContentHash, Bytes>>,
}

impl MemoryByteStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.blobs.read().map(|b| b.len()).unwrap_or(0)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn remove(&self, id: &ContentHash) -> bool {
        self.blobs
            .write()
            .map(|mut b| b.remove(id).is_some())
            .unwrap_or(false)
    }
}

#[async_trait]
impl ByteStore for MemoryByteStore {
    async fn exists(&self, id: &ContentHash) -> ReelResult<bool> {
        validate_key(id)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| ReelError::store_not_ready("memory store lock poisoned"))?;
        Ok(blobs.contains_key(id))
    }

    async fn write(&self, id: &ContentHash, mut stream: ByteStream) -> ReelResult<u64> {
        validate_key(id)?;
        let mut buf = Vec::new();
        stream
            .read_to_end(&mut buf)
            .await
            .map_err(|e| ReelError::store_not_ready(format!("read input for '{id}': {e}")))?;
        let n = buf.len() as u64;
        self.blobs
            .write()
            .map_err(|_| ReelError::store_not_ready("memory store lock poisoned"))?
            .insert(id.clone(), Bytes::from(buf));
        Ok(n)
    }

    async fn read_stream(&self, id: &ContentHash) -> ReelResult<ByteStream> {
        validate_key(id)?;
        let blobs = self
            .blobs
            .read()
            .map_err(|_| ReelError::store_not_ready("memory store lock poisoned"))?;
        blobs
            .get(id)
            .cloned()
            .map(stream_from_bytes)
            .ok_or_else(|| ReelError::store_not_ready(format!("no bytes stored for '{id}'")))
    }

    fn local_path(&self, _id: &ContentHash) -> Option<PathBuf> {
        None
    }
}
