//! Memoized, race-free decoding keyed by content hash.

use std::collections::HashMap;
use std::fmt;
use std::future::Future;
use std::hash::Hash;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};

use tokio::sync::OnceCell;

use super::MediaDecoder;
use crate::assets::source::{ContentHash, MediaKind};
use crate::foundation::error::{ReelError, ReelResult};
use crate::store::{ByteStore, ByteStream, read_blob};

/// Keyed single-flight memo table.
///
/// Concurrent callers for the same key await one shared initialization. A failed initialization
/// leaves the slot empty so a later call starts over.
pub(crate) struct Memo<K, V> {
    cells: Mutex<HashMap<K, Arc<OnceCell<V>>>>,
}

impl<K, V> Default for Memo<K, V> {
    fn default() -> Self {
        Self {
            cells: Mutex::new(HashMap::new()),
        }
    }
}

impl<K: Eq + Hash + Clone, V: Clone> Memo<K, V> {
    fn cell(&self, key: &K) -> Arc<OnceCell<V>> {
        let mut cells = self.cells.lock().unwrap_or_else(|p| p.into_inner());
        cells
            .entry(key.clone())
            .or_insert_with(|| Arc::new(OnceCell::new()))
            .clone()
    }

    pub(crate) async fn get_or_try_init<F, Fut>(&self, key: &K, init: F) -> ReelResult<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = ReelResult<V>>,
    {
        let cell = self.cell(key);
        let value = cell.get_or_try_init(init).await?;
        Ok(value.clone())
    }

    pub(crate) fn get(&self, key: &K) -> Option<V> {
        let cells = self.cells.lock().unwrap_or_else(|p| p.into_inner());
        cells.get(key).and_then(|c| c.get().cloned())
    }

    pub(crate) fn remove(&self, key: &K) -> bool {
        let mut cells = self.cells.lock().unwrap_or_else(|p| p.into_inner());
        cells.remove(key).is_some_and(|c| c.initialized())
    }

    pub(crate) fn len(&self) -> usize {
        let cells = self.cells.lock().unwrap_or_else(|p| p.into_inner());
        cells.values().filter(|c| c.initialized()).count()
    }
}

/// Per-kind decode cache: `ContentHash -> Arc<H>`.
///
/// Bytes always reach the decoder through the [`ByteStore`]. A caller-supplied stream is only
/// used to populate the store when the id is not stored yet.
pub struct DecodeCache<H: ?Sized + Send + Sync + 'static> {
    kind: MediaKind,
    store: Arc<dyn ByteStore>,
    decoder: Arc<dyn MediaDecoder<H>>,
    handles: Memo<ContentHash, Arc<H>>,
    decodes: AtomicU64,
}

impl<H: ?Sized + Send + Sync + 'static> fmt::Debug for DecodeCache<H> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DecodeCache")
            .field("kind", &self.kind)
            .field("cached", &self.handles.len())
            .field("decodes", &self.decode_count())
            .finish()
    }
}

impl<H: ?Sized + Send + Sync + 'static> DecodeCache<H> {
    pub fn new(
        kind: MediaKind,
        store: Arc<dyn ByteStore>,
        decoder: Arc<dyn MediaDecoder<H>>,
    ) -> Self {
        Self {
            kind,
            store,
            decoder,
            handles: Memo::default(),
            decodes: AtomicU64::new(0),
        }
    }

    pub fn kind(&self) -> MediaKind {
        self.kind
    }

    /// Decoded handle for `id`, decoding at most once per id.
    ///
    /// - Already decoded: returns the memoized handle; `byte_source` is ignored.
    /// - Not stored and no `byte_source`: `StoreNotReady`.
    /// - Not stored with `byte_source`: the stream is persisted first, then decoded from the store.
    #[tracing::instrument(level = "debug", skip_all, fields(kind = %self.kind, id = %id))]
    pub async fn decode(
        &self,
        id: &ContentHash,
        byte_source: Option<ByteStream>,
    ) -> ReelResult<Arc<H>> {
        self.handles
            .get_or_try_init(id, || self.load(id, byte_source))
            .await
    }

    async fn load(&self, id: &ContentHash, byte_source: Option<ByteStream>) -> ReelResult<Arc<H>> {
        let stored = self.store.exists(id).await?;
        match (stored, byte_source) {
            (true, _) => {}
            (false, Some(stream)) => {
                self.store.write(id, stream).await?;
            }
            (false, None) => {
                return Err(ReelError::store_not_ready(format!(
                    "{} '{id}' is not in the byte store",
                    self.kind
                )));
            }
        }

        let blob = read_blob(self.store.as_ref(), id).await?;
        self.decodes.fetch_add(1, Ordering::Relaxed);
        let handle = self.decoder.decode(blob).await?;
        tracing::debug!(kind = %self.kind, id = %id, "decoded media");
        Ok(handle)
    }

    /// Memoized handle for `id`, without decoding.
    pub fn cached(&self, id: &ContentHash) -> Option<Arc<H>> {
        self.handles.get(id)
    }

    /// Drop the memoized handle for `id`. The next `decode` re-reads the store.
    pub fn evict(&self, id: &ContentHash) -> bool {
        self.handles.remove(id)
    }

    /// Number of decoder invocations so far.
    pub fn decode_count(&self) -> u64 {
        self.decodes.load(Ordering::Relaxed)
    }

    pub fn store(&self) -> &Arc<dyn ByteStore> {
        &self.store
    }
}

#[cfg(test)]
#[path = "../../tests/unit/decode/cache.rs"]
mod tests;
