use std::collections::HashMap;
use std::fmt;
use std::sync::{Arc, Mutex, Weak};

use serde::{Deserialize, Serialize};

/// Media kind of a source or lane.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    Video,
    Audio,
    Image,
    Text,
}

impl MediaKind {
    /// Classify a MIME type (`video/mp4`, `image/png`, ...).
    pub fn from_mime(mime: &str) -> Option<Self> {
        let top = mime.split('/').next()?.trim().to_ascii_lowercase();
        match top.as_str() {
            "video" => Some(Self::Video),
            "audio" => Some(Self::Audio),
            "image" => Some(Self::Image),
            _ => None,
        }
    }

    /// Kinds that carry a trimmable source span.
    pub fn is_trimmable(self) -> bool {
        matches!(self, Self::Video | Self::Audio)
    }

    /// Kinds drawn by the compositor.
    pub fn is_visual(self) -> bool {
        !matches!(self, Self::Audio)
    }
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Video => "video",
            Self::Audio => "audio",
            Self::Image => "image",
            Self::Text => "text",
        };
        f.write_str(s)
    }
}

/// Lowercase hex MD5 digest of a full media payload.
///
/// Computed once at import and reused as the decode-cache and byte-store key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ContentHash(String);

impl ContentHash {
    /// Digest `bytes`.
    pub fn of(bytes: &[u8]) -> Self {
        Self(format!("{:x}", md5::compute(bytes)))
    }

    /// Wrap an already computed digest string.
    pub fn from_hex(hex: impl Into<String>) -> Self {
        Self(hex.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ContentHash {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Immutable metadata for an imported media blob.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Source {
    pub id: ContentHash,
    /// Where the blob came from (file path or URL). Informational; decoding reads the byte store.
    pub locator: String,
    pub name: String,
    /// Container MIME type.
    pub format: String,
    pub kind: MediaKind,
    pub width: Option<u32>,
    pub height: Option<u32>,
    pub duration_frames: u64,
}

/// Hands out one shared [`Source`] per content hash.
///
/// Entries are weak: a source lives as long as some track item references it.
#[derive(Debug, Default)]
pub struct SourceRegistry {
    entries: Mutex<HashMap<ContentHash, Weak<Source>>>,
}

impl SourceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the live source for `source.id`, registering `source` if none is alive.
    pub fn intern(&self, source: Source) -> Arc<Source> {
        let mut entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(existing) = entries.get(&source.id).and_then(Weak::upgrade) {
            return existing;
        }
        entries.retain(|_, w| w.strong_count() > 0);
        let shared = Arc::new(source);
        entries.insert(shared.id.clone(), Arc::downgrade(&shared));
        shared
    }

    /// Look up a live source by id.
    pub fn get(&self, id: &ContentHash) -> Option<Arc<Source>> {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.get(id).and_then(Weak::upgrade)
    }

    /// Number of sources currently referenced by at least one holder.
    pub fn live_count(&self) -> usize {
        let entries = self
            .entries
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        entries.values().filter(|w| w.strong_count() > 0).count()
    }
}

#[cfg(test)]
#[path = "../../tests/unit/assets/source.rs"]
mod tests;
