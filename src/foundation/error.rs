/// Crate-wide result alias.
pub type ReelResult<T> = Result<T, ReelError>;

/// Error taxonomy for the composition engine.
#[derive(thiserror::Error, Debug)]
pub enum ReelError {
    /// Unsupported or corrupt media payload. Not retried.
    #[error("decode failure: {0}")]
    DecodeFailure(String),

    /// Persistent byte store missing the requested bytes or unavailable.
    #[error("store not ready: {0}")]
    StoreNotReady(String),

    /// Drawing surface could not be created.
    #[error("surface unavailable: {0}")]
    SurfaceUnavailable(String),

    /// Split requested outside the item's open interval. Nothing was mutated.
    #[error("invalid split: {0}")]
    InvalidSplit(String),

    /// Invalid configuration or argument.
    #[error("validation error: {0}")]
    Validation(String),

    /// Frame sink or external encoder failure.
    #[error("encode error: {0}")]
    Encode(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serde(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl ReelError {
    pub fn decode(msg: impl Into<String>) -> Self {
        Self::DecodeFailure(msg.into())
    }

    pub fn store_not_ready(msg: impl Into<String>) -> Self {
        Self::StoreNotReady(msg.into())
    }

    pub fn surface(msg: impl Into<String>) -> Self {
        Self::SurfaceUnavailable(msg.into())
    }

    pub fn invalid_split(msg: impl Into<String>) -> Self {
        Self::InvalidSplit(msg.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn encode(msg: impl Into<String>) -> Self {
        Self::Encode(msg.into())
    }

    pub fn serde(msg: impl Into<String>) -> Self {
        Self::Serde(msg.into())
    }

    /// `true` for failures caused by the media payload itself.
    pub fn is_decode_failure(&self) -> bool {
        matches!(self, Self::DecodeFailure(_))
    }

    /// `true` when the byte store could not serve the request.
    pub fn is_store_not_ready(&self) -> bool {
        matches!(self, Self::StoreNotReady(_))
    }
}

impl From<std::io::Error> for ReelError {
    fn from(e: std::io::Error) -> Self {
        Self::Other(anyhow::Error::new(e))
    }
}

#[cfg(test)]
#[path = "../../tests/unit/foundation/error.rs"]
mod tests;
